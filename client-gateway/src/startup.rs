use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{http_trace_layer, request_id_middleware},
};
use service_core::observability::metrics_handler;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::GatewayConfig;
use crate::handlers;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let site = &state.config.site;
    let spa = ServeDir::new(&site.dist_dir).fallback(ServeFile::new(site.index_file()));

    Router::new()
        .route("/api/snug-client", post(handlers::create_snug_client))
        .route("/api/health", get(handlers::health_check))
        .route("/api/metrics", get(metrics_handler))
        .fallback_service(spa)
        .layer(from_fn(handlers::staff_portal_guard))
        .layer(CorsLayer::permissive())
        .layer(from_fn(metrics_middleware))
        .layer(http_trace_layer())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: GatewayConfig) -> anyhow::Result<Self> {
        if !config.snug.has_credentials() {
            tracing::warn!(
                snug_email = config.snug.email.is_some(),
                snug_password = config.snug.password.is_some(),
                "GetSnug credentials missing - client creation will fail"
            );
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            anyhow::anyhow!("Failed to bind to address {}: {}", addr, e)
        })?;

        tracing::info!(
            dist_dir = %config.site.dist_dir.display(),
            "Serving static files"
        );

        let state = AppState::new(config)?;
        let router = build_router(state);

        Ok(Self { listener, router })
    }

    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or_default()
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Client gateway listening on port {}", self.port());
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
