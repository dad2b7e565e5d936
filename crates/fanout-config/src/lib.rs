//! Configuration for the fanout reconciler.
//!
//! This crate provides:
//! - Feature flags passed into the reconciler as explicit configuration
//! - [`ReconcilerConfig`], loaded from a TOML file with `FANOUT__` environment overrides

pub mod feature_flags;
pub mod reconciler;

// Re-export main types
pub use feature_flags::{
    FeatureContext, FeatureFlag, FeatureFlagType, FeatureFlags, KREFERENCE_GROUP_FLAG,
};
pub use reconciler::{ChannelClassConfig, LoggingConfig, ReconcilerConfig, loader};

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
