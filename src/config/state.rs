// Application state module
// Immutable configuration plus the rebuild trigger shared by all connections

use super::types::Config;
use crate::error::ConfigError;
use crate::rebuild::RebuildTrigger;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Request path of the webhook, `None` when the webhook is disabled
    pub webhook_path: Option<String>,
    pub rebuild: Option<RebuildTrigger>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let webhook_path = config.webhook_path();
        let rebuild = match (&webhook_path, config.rebuild.secret.as_deref()) {
            (Some(_), Some(secret)) => Some(RebuildTrigger::new(secret, &config.rebuild)?),
            _ => None,
        };

        Ok(Self {
            config,
            webhook_path,
            rebuild,
        })
    }
}
