#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use secrecy::Secret;
use site_orchestrator::config::{
    CrmConfig, CrmSecrets, DatastoreConfig, OrchestratorConfig, SiteConfig,
};
use site_orchestrator::services::{CrmApi, UpstreamCrmApi};
use site_orchestrator::startup::build_router;
use site_orchestrator::supervisor::{ProcessSpec, Supervisor, SupervisorHandle};
use site_orchestrator::AppState;
use http_body_util::BodyExt;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

pub fn test_config(crm_origin: &str, site_root: &Path) -> OrchestratorConfig {
    OrchestratorConfig {
        common: service_core::config::Config {
            port: 3000,
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
        site: SiteConfig {
            dist_dir: site_root.join("dist"),
            staff_portal_dir: site_root.join("staff-portal"),
        },
        crm: CrmConfig {
            working_dir: site_root.to_path_buf(),
            command: "sh -c true".to_string(),
            port: 3001,
            graphql_url: format!("{}/graphql", crm_origin),
            api_url: format!("{}/rest", crm_origin),
            restart_delay_secs: 5,
            startup_delay_secs: 0,
        },
        datastores: DatastoreConfig {
            database_url: Some(Secret::new("postgres://crm@localhost/crm".to_string())),
            redis_url: None,
        },
        public_domain: None,
        secrets: CrmSecrets {
            access_token: Secret::new("a".to_string()),
            login_token: Secret::new("l".to_string()),
            refresh_token: Secret::new("r".to_string()),
            file_token: Secret::new("f".to_string()),
        },
    }
}

/// Lay out a built site and staff portal under `root`.
pub fn write_site(root: &Path) {
    let dist = root.join("dist");
    std::fs::create_dir_all(dist.join("assets")).unwrap();
    std::fs::write(dist.join("index.html"), "<html>spa shell</html>").unwrap();
    std::fs::write(dist.join("assets/app.js"), "console.log('app');").unwrap();

    let portal = root.join("staff-portal");
    std::fs::create_dir_all(&portal).unwrap();
    std::fs::write(portal.join("index.html"), "<html>staff portal</html>").unwrap();
    std::fs::write(portal.join("portal.css"), "body { margin: 0; }").unwrap();
}

pub fn shell(name: &str, script: &str) -> ProcessSpec {
    ProcessSpec {
        name: name.to_string(),
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        working_dir: None,
        env: BTreeMap::new(),
    }
}

/// A supervisor that stays in its start delay for the whole test.
pub fn idle_supervisor() -> SupervisorHandle {
    Supervisor::new(shell("idle", "exit 0"))
        .with_start_delay(Duration::from_secs(600))
        .start()
}

pub fn router_with(
    config: OrchestratorConfig,
    supervisor: SupervisorHandle,
    crm_api: Option<Arc<dyn CrmApi>>,
) -> Router {
    let http = reqwest::Client::new();
    let crm_api = crm_api.unwrap_or_else(|| {
        Arc::new(UpstreamCrmApi::new(http.clone(), config.crm.api_url.clone()))
    });

    build_router(AppState {
        config,
        supervisor,
        crm_api,
        http,
        started_at: Instant::now(),
    })
}

pub async fn wait_until<F>(handle: &SupervisorHandle, timeout: Duration, predicate: F)
where
    F: Fn(&site_orchestrator::supervisor::ProcessStatus) -> bool,
{
    let mut updates = handle.subscribe();
    tokio::time::timeout(timeout, async {
        loop {
            if predicate(&updates.borrow_and_update()) {
                return;
            }
            if updates.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .expect("Timed out waiting for supervisor state");
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app.oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let (status, _, body) = send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await;
    (status, body)
}
