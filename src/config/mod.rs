// Configuration module entry point
// Loads layered configuration once at startup and holds shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::ConfigError;

// Re-export public types
pub use state::AppState;
pub use types::{Config, LogFormat, LoggingConfig, RebuildConfig, SiteConfig};

/// Default config file name (extension resolved by the `config` crate)
pub const DEFAULT_CONFIG_PATH: &str = "pisocnet";

/// Environment variable prefix, nested keys use `__` (`PISOCNET_SERVER__PORT`)
const ENV_PREFIX: &str = "PISOCNET";

/// Flat variable names used by existing deployments
const LEGACY_ENDPOINT_VAR: &str = "PISOCNET_REBUILD_ENDPOINT";
const LEGACY_SECRET_VAR: &str = "PISOCNET_REBUILD_SECRET";

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

impl Config {
    /// Load configuration from specified file path (without extension),
    /// then environment overrides, then validate.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("rebuild.endpoint", std::env::var(LEGACY_ENDPOINT_VAR).ok())?
            .set_override_option("rebuild.secret", std::env::var(LEGACY_SECRET_VAR).ok())?
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from an inline TOML document layered over defaults.
    #[cfg(test)]
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = with_defaults(config::Config::builder())?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Normalize the webhook endpoint and reject unusable combinations.
    fn validate(&mut self) -> Result<(), ConfigError> {
        self.rebuild.endpoint = self
            .rebuild
            .endpoint
            .take()
            .map(|e| e.trim_matches('/').to_string())
            .filter(|e| !e.is_empty());

        if self.rebuild.endpoint.is_some()
            && self.rebuild.secret.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "rebuild.endpoint is set but rebuild.secret is missing or empty".to_string(),
            ));
        }
        if self.rebuild.pull_command.is_empty() {
            return Err(ConfigError::Invalid("rebuild.pull_command is empty".to_string()));
        }
        if self.rebuild.build_command.is_empty() {
            return Err(ConfigError::Invalid("rebuild.build_command is empty".to_string()));
        }
        if self.site.index_file.is_empty() || self.site.index_file.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "site.index_file must be a plain file name, got '{}'",
                self.site.index_file
            )));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| ConfigError::Address { addr, source })
    }

    /// Full request path of the webhook (`/<endpoint>`), if enabled
    pub fn webhook_path(&self) -> Option<String> {
        self.rebuild.endpoint.as_ref().map(|e| format!("/{e}"))
    }
}

fn with_defaults(builder: Builder) -> Result<Builder, config::ConfigError> {
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("server.backlog", 128)?
        .set_default("site.root", "hugo/public")?
        .set_default("site.index_file", "index.html")?
        .set_default("site.not_found_file", "404.html")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "compact")?
        .set_default("logging.access_log", true)?
        .set_default("performance.keep_alive", true)?
        .set_default("performance.request_timeout", 300)?
        .set_default("http.server_name", "pisocnet")?
        .set_default("http.max_body_size", 1_048_576)? // 1MB
        .set_default("http.cache_max_age", 3600)
}
