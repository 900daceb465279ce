// Classification error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Classification error code constants
///
/// These constants are the single source of truth for the `error_code` field
/// of a failed classification result.
///
/// Error code range: 3001-3005
pub struct ClassifyErrorCodes {}

impl ClassifyErrorCodes {
    /// Input path does not exist
    pub const FILE_NOT_FOUND: i32 = 3001;

    /// Input exists but could not be read
    pub const IO: i32 = 3002;

    /// Input could not be parsed as audio (corrupt or unsupported container)
    pub const DECODE: i32 = 3003;

    /// Feature vector could not be scored by the model
    pub const INFERENCE: i32 = 3004;

    /// Any other failure inside the pipeline
    pub const UNKNOWN: i32 = 3005;
}

/// Log a classification error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_classify_error(err: &ClassifyError, context: &str) {
    error!(
        "Classify error in {}: code={}, kind={}, message={}",
        context,
        err.code(),
        err.kind(),
        err.message()
    );
}

/// Errors raised inside the audio-to-decision pipeline
///
/// None of these escape `AnalysisPipeline::classify`; they are folded into a
/// failed `ClassificationResult` at that boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyError {
    /// The input path does not exist
    FileNotFound { path: String },

    /// The input exists but reading it failed
    Io { details: String },

    /// Unreadable/corrupt audio or unsupported container
    Decode { reason: String },

    /// Shape or value mismatch while scoring the feature vector
    Inference { reason: String },

    /// Anything else, including panics caught at the boundary
    Unknown { details: String },
}

impl ClassifyError {
    /// Stable snake_case name of the error category
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::FileNotFound { .. } => "file_not_found",
            ClassifyError::Io { .. } => "io_error",
            ClassifyError::Decode { .. } => "decode_error",
            ClassifyError::Inference { .. } => "inference_error",
            ClassifyError::Unknown { .. } => "unknown",
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        ClassifyError::Decode {
            reason: reason.into(),
        }
    }

    pub fn inference(reason: impl Into<String>) -> Self {
        ClassifyError::Inference {
            reason: reason.into(),
        }
    }
}

impl ErrorCode for ClassifyError {
    fn code(&self) -> i32 {
        match self {
            ClassifyError::FileNotFound { .. } => ClassifyErrorCodes::FILE_NOT_FOUND,
            ClassifyError::Io { .. } => ClassifyErrorCodes::IO,
            ClassifyError::Decode { .. } => ClassifyErrorCodes::DECODE,
            ClassifyError::Inference { .. } => ClassifyErrorCodes::INFERENCE,
            ClassifyError::Unknown { .. } => ClassifyErrorCodes::UNKNOWN,
        }
    }

    fn message(&self) -> String {
        match self {
            ClassifyError::FileNotFound { path } => format!("File not found: {}", path),
            ClassifyError::Io { details } => format!("Failed to read audio: {}", details),
            ClassifyError::Decode { reason } => format!("Decode error: {}", reason),
            ClassifyError::Inference { reason } => format!("Inference error: {}", reason),
            ClassifyError::Unknown { details } => details.clone(),
        }
    }
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClassifyError::{} (code {}): {}",
            self.kind(),
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ClassifyError {}

impl From<std::io::Error> for ClassifyError {
    fn from(err: std::io::Error) -> Self {
        ClassifyError::Io {
            details: err.to_string(),
        }
    }
}

/// Any hound failure means the bytes are not a readable WAV stream
///
/// Opening the file is the only I/O step that maps to `Io`; once the reader
/// exists, short reads and bad chunks are parse failures.
impl From<hound::Error> for ClassifyError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => {
                ClassifyError::decode(format!("truncated or corrupt WAV data: {}", io))
            }
            other => ClassifyError::decode(format!("invalid WAV data: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_error_codes() {
        assert_eq!(
            ClassifyError::FileNotFound {
                path: "x.wav".to_string()
            }
            .code(),
            ClassifyErrorCodes::FILE_NOT_FOUND
        );
        assert_eq!(
            ClassifyError::Io {
                details: "test".to_string()
            }
            .code(),
            ClassifyErrorCodes::IO
        );
        assert_eq!(ClassifyError::decode("test").code(), 3003);
        assert_eq!(ClassifyError::inference("test").code(), 3004);
        assert_eq!(
            ClassifyError::Unknown {
                details: "test".to_string()
            }
            .code(),
            ClassifyErrorCodes::UNKNOWN
        );
    }

    #[test]
    fn test_classify_error_messages() {
        let err = ClassifyError::FileNotFound {
            path: "/tmp/missing.wav".to_string(),
        };
        assert_eq!(err.message(), "File not found: /tmp/missing.wav");

        let err = ClassifyError::decode("bad RIFF header");
        assert_eq!(err.message(), "Decode error: bad RIFF header");

        let err = ClassifyError::inference("expected 1 output row, got 0");
        assert!(err.message().starts_with("Inference error"));

        let err = ClassifyError::Unknown {
            details: "boom".to_string(),
        };
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_classify_error_kinds() {
        assert_eq!(ClassifyError::decode("x").kind(), "decode_error");
        assert_eq!(ClassifyError::inference("x").kind(), "inference_error");
        assert_eq!(
            ClassifyError::FileNotFound {
                path: String::new()
            }
            .kind(),
            "file_not_found"
        );
    }

    #[test]
    fn test_classify_error_display() {
        let err = ClassifyError::decode("truncated");
        let display = format!("{}", err);
        assert!(display.contains("ClassifyError::decode_error"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ClassifyError = io_err.into();
        match err {
            ClassifyError::Io { details } => assert!(details.contains("denied")),
            other => panic!("Expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_from_hound_format_error_is_decode() {
        let err: ClassifyError = hound::Error::FormatError("no RIFF tag found").into();
        assert_eq!(err.kind(), "decode_error");
        assert!(err.message().contains("no RIFF tag found"));
    }

    #[test]
    fn test_from_hound_short_read_is_decode() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "Failed to read enough bytes.");
        let err: ClassifyError = hound::Error::IoError(io).into();
        assert_eq!(err.kind(), "decode_error");
        assert_eq!(err.code(), ClassifyErrorCodes::DECODE);
        assert!(err.message().contains("Failed to read enough bytes"));
    }
}
