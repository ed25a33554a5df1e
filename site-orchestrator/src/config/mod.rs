use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config::{self as core_config, get_env, optional_env, parse_env};
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::supervisor::ProcessSpec;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CRM_PORT: u16 = 3001;

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub site: SiteConfig,
    pub crm: CrmConfig,
    pub datastores: DatastoreConfig,
    /// Public host name, without scheme.
    pub public_domain: Option<String>,
    pub secrets: CrmSecrets,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub dist_dir: PathBuf,
    pub staff_portal_dir: PathBuf,
}

impl SiteConfig {
    pub fn index_file(&self) -> PathBuf {
        self.dist_dir.join("index.html")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrmConfig {
    /// Directory the backend is launched from.
    pub working_dir: PathBuf,
    /// Launch command, split on whitespace.
    pub command: String,
    pub port: u16,
    /// Where `/api/graphql` is forwarded to.
    pub graphql_url: String,
    /// Base URL the default CRM API collaborator forwards to.
    pub api_url: String,
    pub restart_delay_secs: u64,
    pub startup_delay_secs: u64,
}

impl CrmConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreConfig {
    pub database_url: Option<Secret<String>>,
    pub redis_url: Option<Secret<String>>,
}

impl DatastoreConfig {
    pub fn database_configured(&self) -> bool {
        self.database_url.is_some()
    }

    pub fn redis_configured(&self) -> bool {
        self.redis_url.is_some()
    }

    /// Names of the datastore variables that are not set.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.database_configured() {
            missing.push("DATABASE_URL");
        }
        if !self.redis_configured() {
            missing.push("REDIS_URL");
        }
        missing
    }
}

/// Token secrets handed to the CRM backend.
#[derive(Debug, Clone, Deserialize)]
pub struct CrmSecrets {
    pub access_token: Secret<String>,
    pub login_token: Secret<String>,
    pub refresh_token: Secret<String>,
    pub file_token: Secret<String>,
}

impl OrchestratorConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load(DEFAULT_PORT)?;
        let crm_port = parse_env("CRM_PORT", DEFAULT_CRM_PORT)?;
        let crm_origin = format!("http://localhost:{}", crm_port);
        let default_api_url = format!("{}/rest", crm_origin);

        Ok(OrchestratorConfig {
            common,
            site: SiteConfig {
                dist_dir: PathBuf::from(get_env("DIST_DIR", Some("dist"))?),
                staff_portal_dir: PathBuf::from(get_env(
                    "STAFF_PORTAL_DIR",
                    Some("public/staff-portal"),
                )?),
            },
            crm: CrmConfig {
                working_dir: PathBuf::from(get_env("CRM_WORKDIR", Some("twenty-crm"))?),
                command: get_env("CRM_COMMAND", Some("npm start"))?,
                port: crm_port,
                graphql_url: format!("{}/graphql", crm_origin),
                api_url: get_env("CRM_API_URL", Some(default_api_url.as_str()))?,
                restart_delay_secs: parse_env("CRM_RESTART_DELAY_SECS", 5)?,
                startup_delay_secs: parse_env("CRM_STARTUP_DELAY_SECS", 2)?,
            },
            datastores: DatastoreConfig {
                database_url: optional_env("DATABASE_URL").map(Secret::new),
                redis_url: optional_env("REDIS_URL").map(Secret::new),
            },
            public_domain: optional_env("RAILWAY_PUBLIC_DOMAIN"),
            secrets: CrmSecrets {
                access_token: secret_or("ACCESS_TOKEN_SECRET", "twenty-access-token-secret"),
                login_token: secret_or("LOGIN_TOKEN_SECRET", "twenty-login-token-secret"),
                refresh_token: secret_or("REFRESH_TOKEN_SECRET", "twenty-refresh-token-secret"),
                file_token: secret_or("FILE_TOKEN_SECRET", "twenty-file-token-secret"),
            },
        })
    }

    /// Externally visible origin of the site.
    pub fn public_origin(&self) -> String {
        let domain = self
            .public_domain
            .clone()
            .unwrap_or_else(|| format!("localhost:{}", DEFAULT_PORT));
        format!("https://{}", domain)
    }

    /// Variables layered over the inherited environment when the CRM
    /// backend is launched.
    pub fn crm_environment(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();

        if let Some(url) = &self.datastores.database_url {
            env.insert("PG_DATABASE_URL".into(), url.expose_secret().clone());
        }
        if let Some(url) = &self.datastores.redis_url {
            env.insert("REDIS_URL".into(), url.expose_secret().clone());
        }

        env.insert("PORT".into(), self.crm.port.to_string());
        env.insert("FRONT_BASE_URL".into(), self.public_origin());
        env.insert("SERVER_URL".into(), self.public_origin());

        env.insert("SIGN_IN_PREFILLED".into(), "true".into());
        env.insert("IS_SIGN_UP_DISABLED".into(), "false".into());

        env.insert(
            "ACCESS_TOKEN_SECRET".into(),
            self.secrets.access_token.expose_secret().clone(),
        );
        env.insert(
            "LOGIN_TOKEN_SECRET".into(),
            self.secrets.login_token.expose_secret().clone(),
        );
        env.insert(
            "REFRESH_TOKEN_SECRET".into(),
            self.secrets.refresh_token.expose_secret().clone(),
        );
        env.insert(
            "FILE_TOKEN_SECRET".into(),
            self.secrets.file_token.expose_secret().clone(),
        );

        env.insert("TELEMETRY_ENABLED".into(), "false".into());
        env.insert("TELEMETRY_ANONYMIZATION_ENABLED".into(), "false".into());

        env
    }

    pub fn crm_process(&self) -> Result<ProcessSpec, AppError> {
        let mut parts = self.crm.command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| AppError::ConfigError("CRM_COMMAND must not be empty".to_string()))?;

        Ok(ProcessSpec {
            name: "TwentyCRM".to_string(),
            program,
            args: parts.collect(),
            working_dir: Some(self.crm.working_dir.clone()),
            env: self.crm_environment(),
        })
    }
}

fn secret_or(key: &str, fallback: &str) -> Secret<String> {
    Secret::new(optional_env(key).unwrap_or_else(|| fallback.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_config() -> OrchestratorConfig {
        OrchestratorConfig {
            common: core_config::Config {
                port: DEFAULT_PORT,
                log_level: "info".to_string(),
                otlp_endpoint: None,
            },
            site: SiteConfig {
                dist_dir: PathBuf::from("dist"),
                staff_portal_dir: PathBuf::from("public/staff-portal"),
            },
            crm: CrmConfig {
                working_dir: PathBuf::from("twenty-crm"),
                command: "npm start".to_string(),
                port: DEFAULT_CRM_PORT,
                graphql_url: "http://localhost:3001/graphql".to_string(),
                api_url: "http://localhost:3001/rest".to_string(),
                restart_delay_secs: 5,
                startup_delay_secs: 2,
            },
            datastores: DatastoreConfig {
                database_url: Some(Secret::new("postgres://crm@db/crm".to_string())),
                redis_url: None,
            },
            public_domain: Some("immigrantsrus.example".to_string()),
            secrets: CrmSecrets {
                access_token: Secret::new("twenty-access-token-secret".to_string()),
                login_token: Secret::new("twenty-login-token-secret".to_string()),
                refresh_token: Secret::new("twenty-refresh-token-secret".to_string()),
                file_token: Secret::new("custom-file-secret".to_string()),
            },
        }
    }

    #[test]
    fn crm_environment_applies_fixed_overrides() {
        let env = sample_config().crm_environment();

        assert_eq!(env["PG_DATABASE_URL"], "postgres://crm@db/crm");
        assert!(!env.contains_key("REDIS_URL"));
        assert_eq!(env["PORT"], "3001");
        assert_eq!(env["FRONT_BASE_URL"], "https://immigrantsrus.example");
        assert_eq!(env["SERVER_URL"], "https://immigrantsrus.example");
        assert_eq!(env["SIGN_IN_PREFILLED"], "true");
        assert_eq!(env["IS_SIGN_UP_DISABLED"], "false");
        assert_eq!(env["FILE_TOKEN_SECRET"], "custom-file-secret");
        assert_eq!(env["TELEMETRY_ENABLED"], "false");
        assert_eq!(env["TELEMETRY_ANONYMIZATION_ENABLED"], "false");
    }

    #[test]
    fn public_origin_falls_back_to_localhost() {
        let mut config = sample_config();
        config.public_domain = None;
        assert_eq!(config.public_origin(), "https://localhost:3000");
    }

    #[test]
    fn crm_command_is_split_into_program_and_args() {
        let spec = sample_config().crm_process().unwrap();
        assert_eq!(spec.program, "npm");
        assert_eq!(spec.args, vec!["start".to_string()]);
        assert_eq!(spec.working_dir, Some(PathBuf::from("twenty-crm")));
    }

    #[test]
    fn empty_crm_command_is_rejected() {
        let mut config = sample_config();
        config.crm.command = "   ".to_string();
        assert!(matches!(
            config.crm_process(),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn missing_datastores_are_listed() {
        assert_eq!(sample_config().datastores.missing(), vec!["REDIS_URL"]);
    }

    #[test]
    fn secret_fallback_applies_when_unset() {
        let secret = secret_or("ORCHESTRATOR_TEST_UNSET_SECRET", "twenty-login-token-secret");
        assert_eq!(secret.expose_secret(), "twenty-login-token-secret");
    }
}
