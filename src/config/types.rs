// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub cache: CacheConfig,
    pub archive: ArchiveConfig,
    /// Served trees, `NAME = PATH`
    #[serde(default)]
    pub roots: BTreeMap<String, String>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info` or `debug`
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Whole-connection timeout in seconds, 0 disables it
    pub connection_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Prefix for absolute URLs in playlists, e.g. `https://host/music`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Directory holding favicon.png, robots.txt and `/_/` assets
    #[serde(default)]
    pub static_dir: Option<String>,
}

/// Conditional request configuration
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CacheConfig {
    /// When false, `If-None-Match` is ignored (ETags are still sent)
    pub match_etag: bool,
}

/// On-demand zip archive configuration
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ArchiveConfig {
    /// Off by default; `--zip` turns it on
    pub enabled: bool,
    /// Simultaneous archive builds allowed process-wide
    pub max_concurrent: usize,
}
