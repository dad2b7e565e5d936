use thiserror::Error;

/// Core error types for resource model operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid apiVersion: {0}")]
    InvalidApiVersion(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid {kind} object: {message}")]
    InvalidObject { kind: String, message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl CoreError {
    /// Create a new InvalidApiVersion error
    pub fn invalid_api_version(api_version: impl Into<String>) -> Self {
        Self::InvalidApiVersion(api_version.into())
    }

    /// Create a new InvalidReference error
    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::InvalidReference(message.into())
    }

    /// Create a new InvalidObject error
    pub fn invalid_object(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidObject {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidApiVersion(_) | Self::InvalidReference(_) | Self::UrlError(_) => {
                ErrorCategory::Validation
            }
            Self::InvalidObject { .. } => ErrorCategory::Conversion,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conversion,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Conversion => write!(f, "conversion"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
