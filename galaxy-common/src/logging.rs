//! Tracing subscriber setup shared by Galaxy binaries
//!
//! The subscriber is installed before configuration is read so that config
//! loading itself is logged; the configured level is applied afterwards
//! through [`LogFilterHandle::apply_level`].

use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Handle onto the installed filter
pub struct LogFilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogFilterHandle {
    /// Swap in the configured directive. No-op while `RUST_LOG` governs the filter.
    pub fn apply_level(&self, directive: &str) -> Result<()> {
        if self.from_env {
            return Ok(());
        }
        let filter = parse_filter(directive)?;
        self.handle
            .reload(filter)
            .map_err(|e| Error::Internal(format!("Log filter reload failed: {}", e)))?;
        tracing::debug!(directive, "Log level applied");
        Ok(())
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. "info" or
/// "galaxy_enrich=debug") is used until [`LogFilterHandle::apply_level`] replaces it.
pub fn init_tracing(default_directive: &str) -> Result<LogFilterHandle> {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (parse_filter(default_directive)?, false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Internal(format!("Tracing already initialized: {}", e)))?;

    Ok(LogFilterHandle { handle, from_env })
}

fn parse_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directive, e)))
}
