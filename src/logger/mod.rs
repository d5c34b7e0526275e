//! Logger module
//!
//! Installs the `tracing` subscriber and provides the server's lifecycle and
//! access logging helpers on top of it.

mod format;

pub use format::AccessLogEntry;

use std::net::SocketAddr;

use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat, LoggingConfig};
use crate::error::DishError;

/// Target used for access log lines, filterable on its own via `RUST_LOG`
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber
///
/// Should be called once at application startup. `RUST_LOG` overrides the
/// configured level.
pub fn init(logging: &LoggingConfig) -> Result<(), DishError> {
    let env_filter = EnvFilter::builder()
        .parse(&logging.level)
        .map_err(|e| DishError::config(format!("invalid log level '{}': {e}", logging.level)))?;
    let env_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or(env_filter);

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer().json().with_current_span(true).with_target(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| DishError::config(format!("failed to install tracing subscriber: {e}")))
}

pub fn log_server_start(addr: &SocketAddr, api_addr: &SocketAddr, config: &Config) {
    tracing::info!(
        listen = %addr,
        api = %api_addr,
        source = %config.dish.source,
        file = config.dish.options.file,
        capacity_bytes = config.cache.capacity_bytes,
        max_age_ms = config.cache.max_age_ms,
        workers = ?config.server.workers,
        "dish server started"
    );
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!(peer = %peer_addr, "connection accepted");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::warn!(error = ?err, "failed to serve connection");
}

pub fn log_api_request(method: &str, path: &str, status: u16) {
    tracing::info!(method, path, status, "management request");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}

pub fn log_shutdown(reason: &str) {
    tracing::info!(reason, "shutting down");
}
