//! Explicit logging context.
//!
//! The pipeline never installs a global subscriber. Instead a [`LogContext`]
//! carries a [`Dispatch`] that each stage enters while it runs: progress goes
//! to stdout, errors also go to a file sink.

use std::{fs::File, path::Path, sync::Mutex};

use anyhow::{Context, Result};
use tracing::{Dispatch, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt};

#[derive(Debug, Clone)]
pub struct LogContext {
    dispatch: Dispatch,
}

impl LogContext {
    /// Console at `level` (`RUST_LOG` wins when set), `ERROR` events to `log_file`.
    ///
    /// The log file is truncated.
    pub fn new(level: &str, log_file: &Path) -> Result<Self> {
        let console_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .with_context(|| format!("Invalid log level: {level}"))?;

        if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }
        let file = File::create(log_file)
            .with_context(|| format!("Failed to open log file: {}", log_file.display()))?;

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(false)
                    .with_filter(console_filter),
            )
            .with(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(LevelFilter::ERROR),
            );

        Ok(Self { dispatch: Dispatch::new(subscriber) })
    }

    /// Discards every event.
    pub fn silent() -> Self {
        Self { dispatch: Dispatch::none() }
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this context as the current subscriber.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}
