//! Process-wide tracing for the reconciler.
//!
//! The filter sits behind a reload layer, so the level from [`LoggingConfig`]
//! can be changed after start-up. `RUST_LOG` overrides the configured level.

use std::sync::OnceLock;

use fanout_config::LoggingConfig;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing(logging: &LoggingConfig) {
    if FILTER.get().is_some() {
        return;
    }
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(_) => EnvFilter::try_from_default_env().map_err(|_| ()),
        Err(_) => EnvFilter::try_new(&logging.level).map_err(|_| ()),
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));

    let (layer, handle) = reload::Layer::new(filter);
    let installed = tracing_subscriber::registry()
        .with(layer)
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_ok();
    // a foreign global subscriber leaves nothing to reload
    if installed {
        let _ = FILTER.set(handle);
    }
}

/// Swaps the active filter. Returns false when `level` does not parse or no
/// subscriber was installed by [`init_tracing`].
pub fn apply_logging_level(level: &str) -> bool {
    let Some(handle) = FILTER.get() else {
        return false;
    };
    let filter = match EnvFilter::try_new(level) {
        Ok(filter) => filter,
        Err(e) => {
            tracing::warn!(level, error = %e, "ignoring invalid logging level");
            return false;
        }
    };
    match handle.modify(|f| *f = filter) {
        Ok(()) => {
            tracing::info!(level, "logging level applied");
            true
        }
        Err(e) => {
            tracing::warn!(level, error = %e, "failed to apply logging level");
            false
        }
    }
}
