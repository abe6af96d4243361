// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for frame sources and inference
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  App Layer                   │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │  Inference  │    │     Camera       │   │
//! │  │ (face, seg) │    │  (LiveStream)    │   │
//! │  └─────────────┘    └──────────────────┘   │
//! │                     ┌──────────────────┐   │
//! │                     │ Virtual Camera   │   │
//! │                     │ (file, pattern)  │   │
//! │                     └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Stream request, live stream and backend trait
//! - [`inference`]: Model runtime contract and result schema
//! - [`virtual_camera`]: Synthetic sources for running without hardware

pub mod camera;
pub mod inference;
pub mod virtual_camera;
