//! Logger module
//!
//! Installs the `tracing` subscriber and provides the logging helpers used
//! across the server:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Rebuild command output, one record per line

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{Config, LogFormat, LoggingConfig};
use crate::error::LoggingError;
use crate::rebuild::Step;
use std::net::SocketAddr;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global subscriber
///
/// Should be called once at application startup. `RUST_LOG` overrides the
/// configured level.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let to_terminal = config.file.is_none();
    let make_writer = writer::make_writer(config.file.as_deref())?;

    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_ansi(to_terminal)
            .with_writer(make_writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!("Server started, listening on http://{addr}");
    tracing::info!("Serving content from {}", config.site.root.display());
    match config.webhook_path() {
        Some(_) => tracing::info!(
            "Rebuild webhook enabled (exclusive: {}, background: {})",
            config.rebuild.exclusive,
            config.rebuild.background
        ),
        None => tracing::warn!("rebuild.endpoint not set, rebuild webhook disabled"),
    }
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    if let Some(ref path) = config.logging.file {
        tracing::info!("Log file: {path}");
    }
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!("Connection accepted from {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("Failed to serve connection: {err:?}");
}

pub fn log_info(message: &str) {
    tracing::info!("{message}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// One line of captured pull/build output
pub fn log_command_output(step: Step, line: &str) {
    tracing::info!(target: "rebuild", %step, "{line}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: "access", "{}", entry.format(format));
}

pub fn log_shutdown_requested(signal: &str) {
    tracing::info!("{signal} received, shutting down");
}
