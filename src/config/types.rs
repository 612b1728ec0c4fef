// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub rebuild: RebuildConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Listen backlog passed to `listen(2)`
    pub backlog: i32,
}

/// Content root layout
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Directory produced by the site generator
    pub root: PathBuf,
    /// Document served for `/` and for directory paths
    pub index_file: String,
    /// Document rendered with every 404
    pub not_found_file: String,
}

/// Webhook and rebuild pipeline settings
#[derive(Debug, Deserialize, Clone)]
pub struct RebuildConfig {
    /// Path segment (without leading slash) that accepts webhook deliveries.
    /// The webhook is disabled when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Shared HMAC key, must match the sender's secret
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_pull_command")]
    pub pull_command: Vec<String>,
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,
    /// Working directory for both commands (process cwd when unset)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Reject deliveries that arrive while a rebuild is running
    #[serde(default = "default_true")]
    pub exclusive: bool,
    /// Acknowledge immediately and run the rebuild on a background task
    #[serde(default)]
    pub background: bool,
}

fn default_pull_command() -> Vec<String> {
    vec!["git".to_string(), "pull".to_string()]
}

fn default_build_command() -> Vec<String> {
    ["hugo", "--cleanDestinationDir", "-s", "hugo/"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            secret: None,
            pull_command: default_pull_command(),
            build_command: default_build_command(),
            working_dir: None,
            exclusive: true,
            background: false,
        }
    }
}

/// Output format of the tracing subscriber
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Json,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log file path (optional, stdout if not set)
    #[serde(default)]
    pub file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound for a whole connection, in seconds. Must cover a
    /// synchronous rebuild.
    pub request_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
    pub cache_max_age: u32,
}
