use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

/// Settings shared by every front-end binary.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load from an optional `configuration` file and `APP__*` variables.
    /// The platform-provided `PORT` wins over both.
    pub fn load(default_port: u16) -> Result<Self, AppError> {
        load_env_files();

        let config = Cfg::builder()
            .set_default("port", i64::from(default_port))?
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .set_override_option("port", env::var("PORT").ok())?
            .set_override_option(
                "otlp_endpoint",
                env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            )?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// `.env.local` takes precedence over `.env`; neither is required.
pub fn load_env_files() {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();
}

/// Read a variable, falling back to `default`. Missing without a default is a
/// configuration error.
pub fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(AppError::ConfigError(format!("{} is required but not set", key))),
        },
    }
}

/// Read a variable that may legitimately be absent. Empty values count as absent.
pub fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

pub fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| AppError::ConfigError(format!("{} has an invalid value: {}", key, e))),
        Err(_) => Ok(default),
    }
}
