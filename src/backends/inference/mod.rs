// SPDX-License-Identifier: MPL-2.0

//! Inference capability contract
//!
//! Face detection and person segmentation are external capabilities. A
//! [`ModelRuntime`] loads a model for a set of [`ModelOptions`] and hands back
//! an [`InferenceModel`] that maps one frame to one [`InferenceOutput`].
//!
//! Outputs are a closed schema: either a list of boxes or a single mask.
//! The adapters in [`crate::app::frame_processor`] validate them before
//! anything is published to the compositor or overlay.

use crate::backends::camera::Frame;
use crate::errors::InferenceError;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Face detector model variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaceModelVariant {
    /// Short range (within ~2 m), fastest
    #[default]
    Short,
    /// Full range
    Full,
}

/// Options passed to [`ModelRuntime::initialize`]
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOptions {
    FaceDetection {
        variant: FaceModelVariant,
        max_faces: usize,
    },
    Segmentation {
        /// 0 = general model, 1 = landscape model
        model_selection: u8,
        /// Input is mirrored (front camera)
        selfie_mode: bool,
    },
}

impl ModelOptions {
    /// Defaults for the face locator
    pub fn face_detection() -> Self {
        ModelOptions::FaceDetection {
            variant: FaceModelVariant::Short,
            max_faces: crate::constants::MAX_FACES,
        }
    }

    /// Defaults for the person segmenter
    pub fn segmentation() -> Self {
        ModelOptions::Segmentation {
            model_selection: 1,
            selfie_mode: true,
        }
    }
}

/// Axis-aligned box as reported by a face model, in source pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBox {
    pub x_min: f32,
    pub y_min: f32,
    pub width: f32,
    pub height: f32,
    /// Detection confidence, when the model provides one
    pub score: Option<f32>,
}

/// Per-pixel mask values as reported by a segmentation model
#[derive(Debug, Clone, PartialEq)]
pub enum MaskValues {
    /// Foreground probability in `[0, 1]`
    Confidence(Vec<f32>),
    /// Already binarized, 0 = background
    Binary(Vec<u8>),
}

impl MaskValues {
    pub fn len(&self) -> usize {
        match self {
            MaskValues::Confidence(v) => v.len(),
            MaskValues::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single-channel mask as reported by a segmentation model
#[derive(Debug, Clone, PartialEq)]
pub struct RawMask {
    pub width: u32,
    pub height: u32,
    pub values: MaskValues,
}

/// Result of one inference call
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutput {
    Boxes(Vec<RawBox>),
    Mask(RawMask),
}

impl InferenceOutput {
    /// Short name of the variant, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceOutput::Boxes(_) => "boxes",
            InferenceOutput::Mask(_) => "mask",
        }
    }
}

/// A loaded model
pub trait InferenceModel: Send + Sync {
    /// Run the model on one frame
    fn infer(&self, frame: Arc<Frame>) -> BoxFuture<'_, Result<InferenceOutput, InferenceError>>;

    /// Release the underlying model resource
    fn close(&self) {}
}

/// Loads models
pub trait ModelRuntime: Send + Sync {
    /// Runtime name for logging
    fn name(&self) -> &str;

    /// Load a model; failure means the feature is unavailable
    fn initialize(
        &self,
        options: ModelOptions,
    ) -> BoxFuture<'_, Result<Arc<dyn InferenceModel>, InferenceError>>;
}

/// Runtime that never loads anything
///
/// Stands in when no model runtime is configured; every feature relying on
/// it degrades to its fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRuntime;

impl ModelRuntime for NoRuntime {
    fn name(&self) -> &str {
        "none"
    }

    fn initialize(
        &self,
        _options: ModelOptions,
    ) -> BoxFuture<'_, Result<Arc<dyn InferenceModel>, InferenceError>> {
        Box::pin(async {
            Err(InferenceError::InitializationFailed(
                "no model runtime configured".to_string(),
            ))
        })
    }
}
