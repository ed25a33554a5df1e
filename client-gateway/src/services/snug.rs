//! GetSnug API client.
//!
//! Creating a client takes three calls, each depending on the previous one:
//! exchange the service credentials for a token pair, read the account's
//! profile to learn which professional group it belongs to, then create the
//! client inside that group. Tokens are never reused between runs.

use crate::config::SnugConfig;
use crate::models::{
    client::UserDataEnvelope, AuthTokens, CreateClientPayload, CreateClientRequest,
    ProvisionOutcome, UserProfile,
};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use service_core::observability::TracedClientExt;
use thiserror::Error;

/// Substrings in the create-call error text that mean the client is already
/// on file. The API exposes no error code for this, so the match is on the
/// message and is case-sensitive.
pub const DUPLICATE_MARKERS: [&str; 2] = ["already exists", "duplicate"];

#[derive(Debug, Error)]
pub enum SnugError {
    #[error("Server configuration error - missing credentials")]
    MissingCredentials,

    #[error("Authentication failed: {status} - {body}")]
    Authentication { status: u16, body: String },

    #[error("Profile fetch failed: {status} - {body}")]
    ProfileFetch { status: u16, body: String },

    #[error("Client creation failed: {status} - {body}")]
    ClientCreation { status: u16, body: String },

    #[error("Unexpected {step} response: {reason}")]
    MalformedResponse { step: &'static str, reason: String },

    #[error("Request to GetSnug failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SnugError {
    /// Whether a failed create call means the client already exists.
    pub fn is_duplicate_client(&self) -> bool {
        match self {
            SnugError::ClientCreation { .. } => {
                let text = self.to_string();
                DUPLICATE_MARKERS.iter().any(|marker| text.contains(marker))
            }
            _ => false,
        }
    }
}

/// Service credentials, fixed for the life of the process.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: Secret<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Clone)]
pub struct SnugClient {
    client: Client,
    config: SnugConfig,
}

impl SnugClient {
    pub fn new(config: SnugConfig) -> Result<Self, SnugError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self { client, config })
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.config.email, &self.config.password) {
            (Some(identifier), Some(secret)) => Some(Credentials {
                identifier: identifier.clone(),
                secret: secret.clone(),
            }),
            _ => None,
        }
    }

    /// Run the whole login → profile → create chain for one caller request.
    pub async fn provision_client(
        &self,
        request: &CreateClientRequest,
    ) -> Result<ProvisionOutcome, SnugError> {
        let credentials = self.credentials().ok_or(SnugError::MissingCredentials)?;

        tracing::info!("Step 1: Authenticating with GetSnug");
        let tokens = self.authenticate(&credentials).await?;

        tracing::info!("Step 2: Fetching GetSnug user profile");
        let profile = self.fetch_profile(&tokens).await?;

        tracing::info!(
            subject_id = %profile.subject_id,
            professional_group_id = %profile.professional_group_id,
            "Step 3: Creating GetSnug client"
        );
        let payload = CreateClientPayload::from(request);

        match self.create_client(&tokens, &profile, &payload).await {
            Ok(record) => Ok(ProvisionOutcome::Created(record)),
            Err(e) if e.is_duplicate_client() => {
                tracing::warn!(error = %e, "GetSnug reports the client already exists");
                Ok(ProvisionOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthTokens, SnugError> {
        let url = format!("{}/api/token/", self.config.auth_base_url);

        let response = self
            .client
            .traced_post(&url)
            .json(&TokenRequest {
                username: &credentials.identifier,
                password: credentials.secret.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SnugError::Authentication { status, body });
        }

        response
            .json::<AuthTokens>()
            .await
            .map_err(|e| SnugError::MalformedResponse {
                step: "authentication",
                reason: e.to_string(),
            })
    }

    pub async fn fetch_profile(&self, tokens: &AuthTokens) -> Result<UserProfile, SnugError> {
        let url = format!(
            "{}/api/v3/user-data/?expand=professional_group_role",
            self.config.api_base_url
        );

        let response = self
            .client
            .traced_get(&url)
            .bearer_auth(&tokens.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SnugError::ProfileFetch { status, body });
        }

        response
            .json::<UserDataEnvelope>()
            .await
            .map(UserProfile::from)
            .map_err(|e| SnugError::MalformedResponse {
                step: "profile",
                reason: e.to_string(),
            })
    }

    pub async fn create_client(
        &self,
        tokens: &AuthTokens,
        profile: &UserProfile,
        payload: &CreateClientPayload,
    ) -> Result<serde_json::Value, SnugError> {
        let url = format!(
            "{}/api/v3/{}/pro-group/{}/pro-people-roles/",
            self.config.api_base_url, profile.subject_id, profile.professional_group_id
        );

        let response = self
            .client
            .traced_post(&url)
            .bearer_auth(&tokens.access_token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SnugError::ClientCreation { status, body });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| SnugError::MalformedResponse {
                step: "client creation",
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creation_error(body: &str) -> SnugError {
        SnugError::ClientCreation {
            status: 400,
            body: body.to_string(),
        }
    }

    #[test]
    fn duplicate_markers_are_pinned() {
        assert!(creation_error(r#"{"detail":"Client already exists"}"#).is_duplicate_client());
        assert!(creation_error("duplicate key value violates unique constraint")
            .is_duplicate_client());
    }

    #[test]
    fn duplicate_match_is_case_sensitive() {
        assert!(!creation_error("Duplicate entry").is_duplicate_client());
        assert!(!creation_error("Already Exists").is_duplicate_client());
    }

    #[test]
    fn other_steps_never_count_as_duplicates() {
        let err = SnugError::Authentication {
            status: 400,
            body: "user already exists".to_string(),
        };
        assert!(!err.is_duplicate_client());
    }

    #[test]
    fn error_text_includes_status_and_body() {
        let err = SnugError::Authentication {
            status: 401,
            body: "bad credentials".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Authentication failed: 401 - bad credentials"
        );
    }
}
