// Configuration module entry point
// Loads layered configuration and holds shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::{AppState, INLINE_DISH_KEY};
pub use types::{
    CacheConfig, Config, DishConfig, LogFormat, LoggingConfig, PerformanceConfig, ServerConfig,
};

use crate::dish::store::{DEFAULT_CAPACITY_BYTES, DEFAULT_MAX_AGE_MILLIS};

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "dish.toml";

impl Config {
    /// Load configuration from specified file path (extension optional)
    ///
    /// Sources, lowest priority first: built-in defaults, the file (if it
    /// exists), then `DISH_*` environment variables (`DISH_CACHE__MAX_AGE_MS`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.api_host", "127.0.0.1")?
            .set_default("server.api_port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "compact")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("cache.capacity_bytes", DEFAULT_CAPACITY_BYTES)?
            .set_default("cache.max_age_ms", DEFAULT_MAX_AGE_MILLIS)?
            .set_default("cache.sweep_interval_secs", 60)?
            .set_default("dish.source", "")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("DISH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    pub fn get_api_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.api_host, self.server.api_port)
            .parse()
            .map_err(|e| format!("Invalid API address: {e}"))
    }
}
