//! Error types for ProtDom
//!
//! Four kinds of failure cross module boundaries: bad caller input
//! ([`ProtDomError::Validation`]), remote service failures
//! ([`ProtDomError::Api`]), local I/O ([`ProtDomError::File`]) and the
//! stage-boundary wrapper ([`ProtDomError::Processing`]) which always keeps
//! the original error as its source.

use thiserror::Error;
use tracing::{debug, error};

/// Result type alias for ProtDom operations
pub type Result<T> = std::result::Result<T, ProtDomError>;

/// Pipeline stage an error escaped from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Annotation,
    Sequence,
    Structure,
    Trim,
    Pipeline,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Annotation => "annotation",
            Stage::Sequence => "sequence",
            Stage::Structure => "structure",
            Stage::Trim => "trim",
            Stage::Pipeline => "pipeline",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for ProtDom
#[derive(Error, Debug)]
pub enum ProtDomError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("File error: {0}")]
    File(String),

    #[error("{stage} stage failed: {source}")]
    Processing {
        stage: Stage,
        #[source]
        source: Box<ProtDomError>,
    },

    #[error("Processing stopped by user")]
    Stopped,
}

impl ProtDomError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an API error without an HTTP status
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
            status: None,
        }
    }

    /// Create an API error carrying the HTTP status of the failed response
    pub fn api_status(msg: impl Into<String>, status: u16) -> Self {
        Self::Api {
            message: msg.into(),
            status: Some(status),
        }
    }

    /// Create a file error
    pub fn file(msg: impl Into<String>) -> Self {
        Self::File(msg.into())
    }

    /// Prefix the message with `context`, keeping the kind and HTTP status
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Self::Validation(msg) => Self::Validation(format!("{}: {}", context, msg)),
            Self::Api { message, status } => Self::Api {
                message: format!("{}: {}", context, message),
                status,
            },
            Self::File(msg) => Self::File(format!("{}: {}", context, msg)),
            other => other,
        }
    }

    /// Short name of the error kind, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Api { .. } => "APIError",
            Self::File(_) => "FileError",
            Self::Processing { .. } => "ProcessingError",
            Self::Stopped => "Stopped",
        }
    }

    /// The innermost error, looking through stage wrappers
    pub fn root(&self) -> &ProtDomError {
        match self {
            Self::Processing { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.root(), Self::Stopped)
    }

    /// Log the error and wrap it for propagation out of `stage`.
    ///
    /// Errors that are already wrapped and cancellations pass through
    /// unchanged so a failure is only logged once.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            Self::Processing { .. } | Self::Stopped => self,
            other => {
                error!(stage = %stage, kind = other.kind(), error = %other, "Stage failed");
                if let Self::Api {
                    status: Some(status),
                    ..
                } = &other
                {
                    debug!(stage = %stage, status, "Error details");
                }
                Self::Processing {
                    stage,
                    source: Box::new(other),
                }
            },
        }
    }
}

impl From<std::io::Error> for ProtDomError {
    fn from(err: std::io::Error) -> Self {
        Self::File(err.to_string())
    }
}

impl From<serde_json::Error> for ProtDomError {
    fn from(err: serde_json::Error) -> Self {
        Self::File(format!("JSON serialization failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_stage_wraps_once() {
        let err = ProtDomError::api_status("InterPro unavailable", 503).at_stage(Stage::Annotation);
        assert_eq!(err.kind(), "ProcessingError");
        assert_eq!(err.to_string(), "annotation stage failed: API error: InterPro unavailable");

        let rewrapped = err.at_stage(Stage::Pipeline);
        match rewrapped {
            ProtDomError::Processing { stage, .. } => assert_eq!(stage, Stage::Annotation),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stopped_passes_through() {
        let err = ProtDomError::Stopped.at_stage(Stage::Trim);
        assert!(err.is_stopped());
        assert_eq!(err.to_string(), "Processing stopped by user");
    }

    #[test]
    fn test_root_looks_through_wrappers() {
        let err = ProtDomError::validation("no accessions").at_stage(Stage::Sequence);
        assert_eq!(err.root().kind(), "ValidationError");
    }

    #[test]
    fn test_context_keeps_status() {
        let err = ProtDomError::api_status("HTTP 404 Not Found", 404).context("P12345");
        match err {
            ProtDomError::Api { message, status } => {
                assert_eq!(message, "P12345: HTTP 404 Not Found");
                assert_eq!(status, Some(404));
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ProtDomError::Stopped.context("ignored").is_stopped());
    }

    #[test]
    fn test_io_error_becomes_file_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pdb");
        let err: ProtDomError = io.into();
        assert_eq!(err.kind(), "FileError");
    }
}
