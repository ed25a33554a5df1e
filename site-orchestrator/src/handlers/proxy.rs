use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;
use service_core::observability::TracedClientExt;

use crate::AppState;

const BACKEND_UNAVAILABLE: &str = "TwentyCRM backend unavailable";

/// Connection-scoped headers that must not be relayed.
const HOP_BY_HOP: [&str; 9] = [
    "host",
    "content-length",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
];

/// Caller headers minus the hop-by-hop ones. `Accept-Encoding` is dropped
/// too: replies are read as plain JSON and relayed uncompressed.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in HOP_BY_HOP {
        forwarded.remove(name);
    }
    forwarded.remove(header::UPGRADE);
    forwarded.remove(header::ACCEPT_ENCODING);
    forwarded
}

/// Relay a GraphQL call to the CRM backend and hand back its status and JSON.
pub async fn graphql_proxy(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let mut request = state
        .http
        .traced_request(method.clone(), &state.config.crm.graphql_url)
        .header("Content-Type", "application/json")
        .headers(forwardable_headers(&headers));

    if method != Method::GET {
        request = request.body(body);
    }

    let response = request.send().await.map_err(|e| {
        tracing::error!(error = %e, "GraphQL proxy error");
        AppError::ServiceUnavailable(BACKEND_UNAVAILABLE.to_string())
    })?;

    let status = response.status();
    let data = response.json::<serde_json::Value>().await.map_err(|e| {
        tracing::error!(error = %e, "GraphQL proxy returned a non-JSON body");
        AppError::ServiceUnavailable(BACKEND_UNAVAILABLE.to_string())
    })?;

    Ok((status, Json(data)).into_response())
}
