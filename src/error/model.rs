// Model loading error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Model loading error code constants
///
/// Error code range: 4001-4004
pub struct ModelErrorCodes {}

impl ModelErrorCodes {
    /// Model artifact could not be read from disk
    pub const ARTIFACT_UNREADABLE: i32 = 4001;

    /// Model file extension does not match a known backend
    pub const UNSUPPORTED_FORMAT: i32 = 4002;

    /// Artifact content could not be parsed
    pub const MALFORMED: i32 = 4003;

    /// Layer shapes do not chain, or input/output size is wrong
    pub const SHAPE_MISMATCH: i32 = 4004;
}

/// Log a model error with structured context
pub fn log_model_error(err: &ModelError, context: &str) {
    error!(
        "Model error in {}: code={}, component=ScoringModel, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while loading the scoring model artifact
///
/// Loading happens once at startup and any of these is fatal to the process.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    ArtifactUnreadable { path: String, details: String },

    UnsupportedFormat { path: String },

    Malformed { reason: String },

    ShapeMismatch { reason: String },
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::ArtifactUnreadable { .. } => ModelErrorCodes::ARTIFACT_UNREADABLE,
            ModelError::UnsupportedFormat { .. } => ModelErrorCodes::UNSUPPORTED_FORMAT,
            ModelError::Malformed { .. } => ModelErrorCodes::MALFORMED,
            ModelError::ShapeMismatch { .. } => ModelErrorCodes::SHAPE_MISMATCH,
        }
    }

    fn message(&self) -> String {
        match self {
            ModelError::ArtifactUnreadable { path, details } => {
                format!("Failed to read model artifact {}: {}", path, details)
            }
            ModelError::UnsupportedFormat { path } => {
                format!(
                    "Unsupported model format for {} (expected .json or .onnx)",
                    path
                )
            }
            ModelError::Malformed { reason } => format!("Malformed model artifact: {}", reason),
            ModelError::ShapeMismatch { reason } => format!("Model shape mismatch: {}", reason),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ModelError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ModelError {}
