#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use client_gateway::config::{GatewayConfig, SiteConfig, SnugConfig};
use client_gateway::startup::build_router;
use client_gateway::AppState;
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::{json, Value};
use std::path::Path;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCESS_TOKEN: &str = "access-abc";
pub const SUBJECT_ID: u64 = 4242;
pub const GROUP_ID: u64 = 77;

pub fn test_config(snug_base: &str, dist_dir: &Path) -> GatewayConfig {
    GatewayConfig {
        common: service_core::config::Config {
            port: 3001,
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
        snug: SnugConfig {
            auth_base_url: snug_base.to_string(),
            api_base_url: snug_base.to_string(),
            email: Some("ops@example.com".to_string()),
            password: Some(Secret::new("hunter2".to_string())),
            request_timeout_secs: 5,
        },
        site: SiteConfig {
            dist_dir: dist_dir.to_path_buf(),
        },
    }
}

pub fn router(config: GatewayConfig) -> Router {
    build_router(AppState::new(config).expect("Failed to build state"))
}

pub fn create_client_path() -> String {
    format!("/api/v3/{}/pro-group/{}/pro-people-roles/", SUBJECT_ID, GROUP_ID)
}

pub async fn mount_login(server: &MockServer, status: u16, expected_calls: u64) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "access": ACCESS_TOKEN,
            "refresh": "refresh-xyz"
        }))
    } else {
        ResponseTemplate::new(status).set_body_string("invalid username or password")
    };

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(template)
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_profile(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v3/user-data/"))
        .and(query_param("expand", "professional_group_role"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "ud_id": SUBJECT_ID,
                "professional_group_role_user_data": { "professional_group_id": GROUP_ID }
            }
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_create(server: &MockServer, template: ResponseTemplate, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(create_client_path()))
        .respond_with(template)
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// POST an arbitrary body, optionally without a content type.
pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: Option<&str>,
    body: &'static str,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        request = request.header("content-type", content_type);
    }

    let response = app
        .oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub fn valid_request() -> Value {
    json!({ "firstName": "Ana", "lastName": "Silva", "email": "ana@example.com" })
}
