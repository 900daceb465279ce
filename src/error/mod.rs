// Error types for the engine fault detector
//
// This module defines custom error types for the classification pipeline and
// model loading, providing structured error handling with numeric codes that
// survive serialization into a classification result.

mod classify;
mod model;

pub use classify::{log_classify_error, ClassifyError, ClassifyErrorCodes};
pub use model::{log_model_error, ModelError, ModelErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the classification boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
