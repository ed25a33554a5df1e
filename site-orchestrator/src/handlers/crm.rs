use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

use crate::services::CrmRequest;
use crate::AppState;

pub const CRM_API_PREFIX: &str = "/api/immigrantrus-crm";

/// Hand `/api/immigrantrus-crm/*` to the CRM collaborator. Failures are
/// reported, not retried.
pub async fn crm_passthrough(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request = CrmRequest {
        method,
        path: strip_prefix(uri.path()),
        query: uri.query().map(str::to_string),
        headers,
        body,
    };

    let response = state.crm_api.handle(request).await.map_err(|e| {
        tracing::error!(error = %e, "CRM API error");
        AppError::upstream("CRM API unavailable", e)
    })?;

    Ok((response.status, response.headers, response.body).into_response())
}

fn strip_prefix(path: &str) -> String {
    match path.strip_prefix(CRM_API_PREFIX) {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::strip_prefix;

    #[test]
    fn prefix_is_removed() {
        assert_eq!(strip_prefix("/api/immigrantrus-crm/contacts/7"), "/contacts/7");
        assert_eq!(strip_prefix("/api/immigrantrus-crm"), "/");
    }
}
