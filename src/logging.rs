//! Tracing setup.
//!
//! The engine only emits `tracing` events; installing a subscriber is left to
//! the embedding application. [`init_logging`] installs a stderr subscriber
//! from a [`LoggingConfig`]. `DATABAG_TRACE_LEVEL` overrides the configured
//! level. Calling it more than once is a no-op.

use crate::config::{LogFormat, LoggingConfig};
use std::env;
use std::sync::OnceLock;

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install the global subscriber; returns false if another one was already set
pub fn init_logging(config: &LoggingConfig) -> bool {
    *INSTALLED.get_or_init(|| {
        let level = env::var("DATABAG_TRACE_LEVEL").unwrap_or_else(|_| config.level.clone());
        let filter = tracing_subscriber::EnvFilter::try_new(level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let base = || {
            tracing_subscriber::fmt()
                .with_env_filter(filter.clone())
                .with_ansi(false)
                .with_writer(std::io::stderr)
        };

        let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match config.format {
            LogFormat::Json => Box::new(base().json().finish()),
            LogFormat::Text => Box::new(base().compact().finish()),
        };

        tracing::subscriber::set_global_default(subscriber).is_ok()
    })
}
