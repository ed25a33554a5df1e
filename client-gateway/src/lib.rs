pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use config::GatewayConfig;
use services::SnugClient;

/// Shared application state: immutable config and the pooled GetSnug client.
#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub snug: SnugClient,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let snug = SnugClient::new(config.snug.clone())?;
        Ok(Self { config, snug })
    }
}
