//! Error taxonomy shared by the analyzer and the presentation layer.
//!
//! None of these are fatal: the session turns each one into a message or a
//! log line and returns to an interactive, non-loading state.

use thiserror::Error;

/// Message shown for any input that is not an absolute http(s) URL.
pub const INVALID_URL_MESSAGE: &str =
    "Please enter a valid URL (must start with http:// or https://).";

/// Message shown when the model call or its response fails.
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "Failed to analyze the page. The model returned no usable video data, please try again.";

/// The submitted text is not a well-formed http or https URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL is empty")]
    Empty,
    #[error("URL is malformed: {0}")]
    Malformed(String),
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

impl ValidationError {
    /// Fixed text presented to the user regardless of the variant.
    pub fn user_message(&self) -> &'static str {
        INVALID_URL_MESSAGE
    }
}

/// The external model call failed or produced output that does not conform.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("model response does not match the video schema: {0}")]
    Schema(String),
    #[error("model request panicked")]
    Panicked,
}

impl AnalysisError {
    pub fn user_message(&self) -> &'static str {
        ANALYSIS_FAILED_MESSAGE
    }
}

/// Local storage could not be read, written or cleared.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stored value for key {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A link returned by the model could not be made absolute.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot resolve {link:?} against {base:?}: {reason}")]
pub struct LinkResolutionError {
    pub link: String,
    pub base: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_fixed() {
        let errors = [
            ValidationError::Empty,
            ValidationError::Malformed("x".to_string()),
            ValidationError::UnsupportedScheme("ftp".to_string()),
        ];
        for err in errors {
            assert_eq!(err.user_message(), INVALID_URL_MESSAGE);
        }
    }

    #[test]
    fn test_analysis_error_hides_detail_from_user() {
        let err = AnalysisError::InvalidJson("expected value at line 1".to_string());
        assert_eq!(err.user_message(), ANALYSIS_FAILED_MESSAGE);
        assert!(err.to_string().contains("line 1"));
    }
}
