//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging to stdout, with an
//! optional append-mode log file. `RUST_LOG` takes precedence over the
//! configured level.

use anyhow::Result;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize logging based on configuration.
///
/// `verbose` raises the configured level to `debug` for this crate. It has
/// no effect when `RUST_LOG` is set.
///
/// # Errors
///
/// Fails if the level is not a valid filter directive, the log file cannot
/// be opened, or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use cachetrigger::config::LoggingConfig;
/// use cachetrigger::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// init_logging(&config, false).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(&config.level, verbose))?,
    };

    let file = config.file_path.as_deref().map(open_log_file).transpose()?;
    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json_format {
        let stdout_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true);
        let file_layer = file.map(|file| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(Arc::new(file))
        });

        registry.with(stdout_layer).with(file_layer).try_init()?;
    } else {
        let stdout_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true);
        let file_layer = file.map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_writer(Arc::new(file))
        });

        registry.with(stdout_layer).with(file_layer).try_init()?;
    }

    Ok(())
}

/// Subscriber for events raised before [`init_logging`] can run.
///
/// Configuration loading decides how logging is set up, so its warnings
/// go to stderr through this subscriber, scoped with
/// `tracing::subscriber::with_default`.
pub fn startup_subscriber() -> impl tracing::Subscriber + Send + Sync + 'static {
    fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .finish()
}

/// Filter directive for a configured level.
fn filter_directive(level: &str, verbose: bool) -> String {
    if verbose {
        format!("{},cachetrigger=debug", level)
    } else {
        level.to_string()
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
