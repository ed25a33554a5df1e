use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{self as core_config, get_env, optional_env, parse_env};
use service_core::error::AppError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub snug: SnugConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnugConfig {
    /// Identity endpoint host, e.g. https://auth.getsnug.com
    pub auth_base_url: String,
    /// Data API host, e.g. https://api.getsnug.com
    pub api_base_url: String,
    /// Login identifier. The identity endpoint calls it `username`.
    pub email: Option<String>,
    pub password: Option<Secret<String>>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl SnugConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_credentials(&self) -> bool {
        self.email.is_some() && self.password.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Directory holding the built single-page application.
    pub dist_dir: PathBuf,
}

impl SiteConfig {
    pub fn index_file(&self) -> PathBuf {
        self.dist_dir.join("index.html")
    }
}

impl GatewayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load(DEFAULT_PORT)?;

        Ok(GatewayConfig {
            common,
            snug: SnugConfig {
                auth_base_url: get_env("SNUG_AUTH_BASE_URL", Some("https://auth.getsnug.com"))?,
                api_base_url: get_env("SNUG_API_BASE_URL", Some("https://api.getsnug.com"))?,
                email: optional_env("VITE_SNUG_EMAIL"),
                password: optional_env("VITE_SNUG_PASSWORD").map(Secret::new),
                request_timeout_secs: parse_env(
                    "SNUG_REQUEST_TIMEOUT_SECS",
                    default_request_timeout_secs(),
                )?,
            },
            site: SiteConfig {
                dist_dir: PathBuf::from(get_env("DIST_DIR", Some("dist"))?),
            },
        })
    }
}
