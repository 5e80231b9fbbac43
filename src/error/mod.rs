//! Error handling module for ClipCut

use thiserror::Error;

/// Errors surfaced by the clip extraction engine and its callers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClipError {
    /// The media runtime failed to initialize (missing binary, unsupported
    /// platform, version mismatch). The caller may retry `load()`.
    #[error("Failed to prepare the clipping engine: {message}")]
    EngineLoad { message: String },

    /// `cut_video()` was called before a successful `load()`
    #[error("Clipping engine is not loaded; call load() first")]
    NotLoaded,

    /// Negative, non-finite, zero-length or inverted time range
    #[error("Invalid clip range: start ({start}s) must be >= 0 and before end ({end}s)")]
    InvalidRange { start: f64, end: f64 },

    /// The transcode itself failed
    #[error("Failed to cut clip: {message}")]
    ClipCut { message: String },

    /// Caller-side deadline elapsed before the cut finished
    #[error("Clip operation timed out after {seconds}s")]
    Timeout { seconds: f64 },
}

impl ClipError {
    /// Whether this error means the clipping tool could not be prepared
    pub fn is_load_failure(&self) -> bool {
        matches!(self, ClipError::EngineLoad { .. })
    }

    /// Whether this error means a specific clip could not be produced
    pub fn is_cut_failure(&self) -> bool {
        matches!(
            self,
            ClipError::ClipCut { .. } | ClipError::InvalidRange { .. } | ClipError::Timeout { .. }
        )
    }
}

/// Errors raised by a media runtime implementation
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Runtime binary or asset could not be located
    #[error("Runtime asset not found: {0}")]
    NotFound(String),

    /// Runtime exists but cannot be used in this environment
    #[error("Unsupported runtime: {0}")]
    Unsupported(String),

    /// Virtual file names must be bare names
    #[error("Invalid virtual file name: {0}")]
    InvalidFileName(String),

    /// No such entry in the virtual filesystem
    #[error("Virtual file not found: {0}")]
    FileNotFound(String),

    /// Transcode command returned a failure
    #[error("Runtime command failed (exit code {code:?}): {stderr}")]
    ExecFailed { code: Option<i32>, stderr: String },

    /// The runtime was torn down
    #[error("Runtime has been terminated")]
    Terminated,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, ClipError>;

/// Result type alias for runtime operations
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        let load = ClipError::EngineLoad {
            message: "ffmpeg missing".to_string(),
        };
        assert!(load.is_load_failure());
        assert!(!load.is_cut_failure());

        let cut = ClipError::ClipCut {
            message: "bad input".to_string(),
        };
        assert!(cut.is_cut_failure());
        assert!(!ClipError::NotLoaded.is_cut_failure());
    }

    #[test]
    fn test_error_messages_keep_root_cause() {
        let err = ClipError::ClipCut {
            message: "Invalid data found when processing input".to_string(),
        };
        assert!(err.to_string().contains("Invalid data found"));

        let range = ClipError::InvalidRange {
            start: 10.0,
            end: 10.0,
        };
        assert!(range.to_string().contains("10s"));
    }

    #[test]
    fn test_timeout_keeps_sub_second_precision() {
        let err = ClipError::Timeout { seconds: 0.25 };
        assert_eq!(err.to_string(), "Clip operation timed out after 0.25s");
        assert!(err.is_cut_failure());
    }
}
