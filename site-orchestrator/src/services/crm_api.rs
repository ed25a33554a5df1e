//! Collaborator behind `/api/immigrantrus-crm`.
//!
//! The router only knows the [`CrmApi`] trait. The default implementation
//! relays calls to the CRM backend's REST API; deployments with a different
//! integration plug in their own.

use async_trait::async_trait;
use axum::body::Bytes;
use http::{HeaderMap, Method, StatusCode};
use reqwest::Client;
use service_core::observability::TracedClientExt;

use crate::handlers::proxy::forwardable_headers;

/// An inbound call, with the `/api/immigrantrus-crm` prefix already removed.
#[derive(Debug, Clone)]
pub struct CrmRequest {
    pub method: Method,
    /// Remaining path, always starting with `/`.
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct CrmResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[async_trait]
pub trait CrmApi: Send + Sync {
    async fn handle(&self, request: CrmRequest) -> anyhow::Result<CrmResponse>;
}

/// Relays calls to the CRM backend's REST API.
pub struct UpstreamCrmApi {
    client: Client,
    base_url: String,
}

impl UpstreamCrmApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn target_url(&self, request: &CrmRequest) -> String {
        match &request.query {
            Some(query) => format!("{}{}?{}", self.base_url, request.path, query),
            None => format!("{}{}", self.base_url, request.path),
        }
    }
}

#[async_trait]
impl CrmApi for UpstreamCrmApi {
    async fn handle(&self, request: CrmRequest) -> anyhow::Result<CrmResponse> {
        let url = self.target_url(&request);

        let response = self
            .client
            .traced_request(request.method.clone(), &url)
            .headers(forwardable_headers(&request.headers))
            .body(request.body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("CRM request to {} failed: {}", url, e))?;

        let status = response.status();
        let mut headers = HeaderMap::new();
        if let Some(content_type) = response.headers().get(http::header::CONTENT_TYPE) {
            headers.insert(http::header::CONTENT_TYPE, content_type.clone());
        }
        let body = response.bytes().await?;

        Ok(CrmResponse {
            status,
            headers,
            body,
        })
    }
}
