use axum::{body::Bytes, extract::State, Json};
use metrics::counter;
use service_core::error::AppError;
use validator::Validate;

use crate::{
    models::{CreateClientRequest, CreateClientResponse, ProvisionOutcome},
    services::SnugError,
    AppState,
};

pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields: firstName, lastName, email";

/// Create a GetSnug client for a website lead.
///
/// Every call authenticates afresh, reads the account profile and creates the
/// client. A duplicate reported by GetSnug is answered as a success. The
/// body is read leniently: anything unusable ends in the missing-fields 400.
pub async fn create_snug_client(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CreateClientResponse>, AppError> {
    let payload = CreateClientRequest::from_body(&body);
    if payload.validate().is_err() {
        counter!("snug_client_requests_total", "outcome" => "invalid").increment(1);
        return Err(AppError::ValidationError(MISSING_FIELDS_MESSAGE.to_string()));
    }

    tracing::info!(
        first_name = %payload.first_name,
        last_name = %payload.last_name,
        email = %payload.email,
        "Creating GetSnug client"
    );

    if state.snug.credentials().is_none() {
        tracing::error!(
            snug_email = state.config.snug.email.is_some(),
            snug_password = state.config.snug.password.is_some(),
            "Missing GetSnug credentials"
        );
        counter!("snug_client_requests_total", "outcome" => "misconfigured").increment(1);
        return Err(AppError::ConfigError(
            SnugError::MissingCredentials.to_string(),
        ));
    }

    let outcome = state.snug.provision_client(&payload).await.map_err(|e| {
        tracing::error!(error = %e, "GetSnug client creation error");
        counter!("snug_client_requests_total", "outcome" => "failed").increment(1);
        AppError::upstream("Failed to create GetSnug client", e)
    })?;

    let label = match &outcome {
        ProvisionOutcome::Created(record) => {
            tracing::info!(record = %record, "GetSnug client created successfully");
            "created"
        }
        ProvisionOutcome::AlreadyExists => "already_exists",
    };
    counter!("snug_client_requests_total", "outcome" => label).increment(1);

    Ok(Json(CreateClientResponse::from(outcome)))
}
