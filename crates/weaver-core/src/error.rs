//! Error types for Dreamweaver.

use thiserror::Error;

use crate::model::ModelError;

/// Message shown to the user whenever a report cannot be produced.
pub const REPORT_FAILURE_MESSAGE: &str =
    "The threads of your dream were lost in transit. Let us try again.";

/// A shared error type for the entire Dreamweaver application.
///
/// `ReportGeneration` and `ChatTurn` form the user-facing taxonomy; the
/// remaining variants belong to the ambient layers (configuration, files,
/// entry-form validation).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeaverError {
    /// The report request failed or its payload did not match the schema.
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// User-facing message, never empty.
        message: String,
        /// Diagnostic detail for logs. Not shown to the user.
        detail: String,
    },

    /// A single chat turn failed.
    #[error("Chat turn failed: {0}")]
    ChatTurn(String),

    /// An entry-form operation was rejected.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// The owning session was reset before the response arrived.
    #[error("Request cancelled: the session was reset")]
    Cancelled,
}

impl WeaverError {
    /// Creates a ReportGeneration error with the standard user-facing message.
    pub fn report_generation(detail: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: REPORT_FAILURE_MESSAGE.to_string(),
            detail: detail.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The text a user should see for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::ReportGeneration { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Check if this is a report generation error
    pub fn is_report_generation(&self) -> bool {
        matches!(self, Self::ReportGeneration { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for WeaverError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for WeaverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for WeaverError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for WeaverError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Provider failures during report generation surface as `ReportGeneration`.
/// Chat code maps them to `ChatTurn` explicitly.
impl From<ModelError> for WeaverError {
    fn from(err: ModelError) -> Self {
        Self::report_generation(err.to_string())
    }
}

/// A type alias for `Result<T, WeaverError>`.
pub type Result<T> = std::result::Result<T, WeaverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_generation_carries_user_message() {
        let err = WeaverError::report_generation("expected value at line 1 column 1");
        assert!(err.is_report_generation());
        assert_eq!(err.user_message(), REPORT_FAILURE_MESSAGE);
        assert!(!err.user_message().is_empty());
    }

    #[test]
    fn model_error_maps_to_report_generation() {
        let err: WeaverError = ModelError::Timeout(std::time::Duration::from_secs(3)).into();
        match err {
            WeaverError::ReportGeneration { message, detail } => {
                assert_eq!(message, REPORT_FAILURE_MESSAGE);
                assert!(detail.contains("timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn json_error_converts_to_serialization() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: WeaverError = parse_err.into();
        assert!(matches!(err, WeaverError::Serialization { ref format, .. } if format == "JSON"));
    }
}
