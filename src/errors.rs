// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera core
//!
//! Only camera acquisition errors are fatal to a session. Inference and
//! capture errors are converted to "no result" at the adapter or pipeline
//! boundary and never reach the render loop.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors
    Camera(CameraError),
    /// Recording-related errors
    Recording(RecordingError),
    /// Photo capture errors
    Photo(PhotoError),
    /// Inference adapter errors
    Inference(InferenceError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Camera-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// User or platform refused camera access
    PermissionDenied,
    /// No camera matching the request
    NotAvailable(String),
    /// Backend failed while opening the stream
    InitializationFailed(String),
    /// Stream ended underneath us
    Disconnected,
}

/// Recording-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    /// Failed to start recording
    StartFailed(String),
    /// Failed to finalize recording
    StopFailed(String),
    /// Encoder rejected a frame
    EncodingFailed(String),
    /// Recording already in progress
    AlreadyRecording,
    /// No frames were recorded
    Empty,
}

/// Photo capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoError {
    /// No frame available for capture
    NoFrameAvailable,
    /// Frame buffer does not match its declared size
    InvalidFrame(String),
    /// Encoding failed
    EncodingFailed(String),
    /// Thumbnail derivation failed
    ThumbnailFailed(String),
    /// Background task failed
    TaskFailed(String),
}

/// Inference adapter errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// Model runtime could not be loaded
    InitializationFailed(String),
    /// A single inference call failed
    InferenceFailed(String),
    /// Model returned something outside the result schema
    MalformedResult(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Recording(e) => write!(f, "Recording error: {}", e),
            AppError::Photo(e) => write!(f, "Photo error: {}", e),
            AppError::Inference(e) => write!(f, "Inference error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::PermissionDenied => write!(f, "Camera access denied"),
            CameraError::NotAvailable(msg) => write!(f, "Camera unavailable: {}", msg),
            CameraError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            CameraError::Disconnected => write!(f, "Camera disconnected"),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::StartFailed(msg) => write!(f, "Failed to start recording: {}", msg),
            RecordingError::StopFailed(msg) => write!(f, "Failed to stop recording: {}", msg),
            RecordingError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            RecordingError::AlreadyRecording => write!(f, "Recording already in progress"),
            RecordingError::Empty => write!(f, "No frames recorded"),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::NoFrameAvailable => write!(f, "No frame available for capture"),
            PhotoError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::ThumbnailFailed(msg) => write!(f, "Thumbnail failed: {}", msg),
            PhotoError::TaskFailed(msg) => write!(f, "Task failed: {}", msg),
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::InitializationFailed(msg) => {
                write!(f, "Model initialization failed: {}", msg)
            }
            InferenceError::InferenceFailed(msg) => write!(f, "Inference failed: {}", msg),
            InferenceError::MalformedResult(msg) => write!(f, "Malformed result: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for RecordingError {}
impl std::error::Error for PhotoError {}
impl std::error::Error for InferenceError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<RecordingError> for AppError {
    fn from(err: RecordingError) -> Self {
        AppError::Recording(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::Inference(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for PhotoError {
    fn from(err: image::ImageError) -> Self {
        PhotoError::EncodingFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for PhotoError {
    fn from(err: tokio::task::JoinError) -> Self {
        PhotoError::TaskFailed(err.to_string())
    }
}

impl From<image::ImageError> for RecordingError {
    fn from(err: image::ImageError) -> Self {
        RecordingError::EncodingFailed(err.to_string())
    }
}
