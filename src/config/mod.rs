// Configuration module entry point
// Loads application configuration and builds the shared runtime state

mod roots;
mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use roots::{parse_root_spec, Root, RootSet, RootSetError};
pub use state::AppState;
pub use types::{
    ArchiveConfig, CacheConfig, Config, HttpConfig, LoggingConfig, PerformanceConfig,
    ServerConfig,
};

/// Default number of simultaneous archive builds
pub const DEFAULT_MAX_ARCHIVES: usize = 2;

impl Config {
    /// Load configuration from specified file path (extension optional)
    ///
    /// Missing files are not an error; environment variables prefixed with
    /// `AUDIOTREE` (nested keys separated by `__`) override file values.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("AUDIOTREE").separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 0)?
            .set_default("http.server_name", "audiotree")?
            .set_default("cache.match_etag", true)?
            .set_default("archive.enabled", false)?
            .set_default("archive.max_concurrent", 2)?
            .build()?;

        settings.try_deserialize()
    }

    /// Configuration with all defaults and no roots, for tests and embedding
    pub fn with_defaults() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                workers: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: false,
                access_log_format: "combined".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive: true,
                connection_timeout: 0,
                max_connections: None,
            },
            http: HttpConfig {
                server_name: "audiotree".to_string(),
                base_url: None,
                static_dir: None,
            },
            cache: CacheConfig { match_etag: true },
            archive: ArchiveConfig {
                enabled: false,
                max_concurrent: DEFAULT_MAX_ARCHIVES,
            },
            roots: std::collections::BTreeMap::new(),
        }
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
