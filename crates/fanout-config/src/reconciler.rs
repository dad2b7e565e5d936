//! Reconciler settings.

use serde::{Deserialize, Serialize};

use crate::feature_flags::FeatureFlags;
use crate::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub channel_class: ChannelClassConfig,
    pub logging: LoggingConfig,
    /// Overrides layered on top of [`FeatureFlags::with_defaults`].
    pub features: FeatureFlags,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            channel_class: ChannelClassConfig::default(),
            logging: LoggingConfig::default(),
            features: FeatureFlags::with_defaults(),
        }
    }
}

/// Group and kind of the indirection object that points at a backing channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelClassConfig {
    pub group: String,
    pub kind: String,
}

impl Default for ChannelClassConfig {
    fn default() -> Self {
        Self {
            group: "messaging.knative.dev".to_string(),
            kind: "Channel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ReconcilerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel_class.group.is_empty() || self.channel_class.kind.is_empty() {
            return Err(ConfigError::validation(
                "channel_class.group and channel_class.kind must be set",
            ));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        if let Some(flag) = self.features.list().find(|f| f.name.is_empty()) {
            return Err(ConfigError::validation(format!(
                "feature flag without a name: {flag:?}"
            )));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let parsed: ReconcilerConfig =
            toml::from_str(raw).map_err(|e| ConfigError::parse(e.to_string()))?;
        let cfg = parsed.with_default_features();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Layers the configured flags over the built-in defaults.
    pub(crate) fn with_default_features(mut self) -> Self {
        let mut features = FeatureFlags::with_defaults();
        features.merge(std::mem::take(&mut self.features));
        self.features = features;
        self
    }
}

pub mod loader {
    use super::ReconcilerConfig;
    use crate::{ConfigError, Result};
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub fn load_config(path: Option<&str>) -> Result<ReconcilerConfig> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                } else {
                    tracing::warn!(path = %p, "config file not found, using defaults");
                }
            }
            None => {
                let default_path = PathBuf::from("fanout.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., FANOUT__LOGGING__LEVEL=debug
        builder = builder.add_source(
            Environment::with_prefix("FANOUT")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::parse(format!("config build error: {e}")))?;
        let merged: ReconcilerConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::parse(format!("config deserialize error: {e}")))?;
        let merged = merged.with_default_features();
        merged.validate()?;
        tracing::debug!(
            channel_class = %format!("{}/{}", merged.channel_class.group, merged.channel_class.kind),
            level = %merged.logging.level,
            "configuration loaded"
        );
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<ReconcilerConfig> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
