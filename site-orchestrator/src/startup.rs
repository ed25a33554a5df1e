use axum::{
    middleware::from_fn,
    routing::{any, get},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{http_trace_layer, request_id_middleware},
};
use service_core::observability::metrics_handler;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::OrchestratorConfig;
use crate::handlers;
use crate::services::UpstreamCrmApi;
use crate::supervisor::{ShutdownSignal, Supervisor, SupervisorHandle};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let site = &state.config.site;
    let index = ServeFile::new(site.index_file());
    let staff_portal = ServeDir::new(&site.staff_portal_dir).fallback(index.clone());
    let spa = ServeDir::new(&site.dist_dir).fallback(index);

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/graphql", any(handlers::graphql_proxy))
        .route("/api/immigrantrus-crm", any(handlers::crm_passthrough))
        .route("/api/immigrantrus-crm/*path", any(handlers::crm_passthrough))
        .nest_service("/staff-portal", staff_portal)
        .fallback_service(spa)
        .layer(CorsLayer::permissive())
        .layer(from_fn(metrics_middleware))
        .layer(http_trace_layer())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    listener: TcpListener,
    router: Router,
    supervisor: SupervisorHandle,
}

impl Application {
    /// Bind the listener and start supervising the CRM backend. The first
    /// spawn waits for the configured startup delay.
    pub async fn build(config: OrchestratorConfig) -> anyhow::Result<Self> {
        let missing = config.datastores.missing();
        if !missing.is_empty() {
            tracing::warn!(missing = ?missing, "Missing environment variables");
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            anyhow::anyhow!("Failed to bind to address {}: {}", addr, e)
        })?;

        let supervisor = Supervisor::new(config.crm_process()?)
            .with_restart_delay(config.crm.restart_delay())
            .with_start_delay(config.crm.startup_delay())
            .start();

        let http = reqwest::Client::new();
        let crm_api = Arc::new(UpstreamCrmApi::new(http.clone(), config.crm.api_url.clone()));

        let state = AppState {
            config,
            supervisor: supervisor.clone(),
            crm_api,
            http,
            started_at: Instant::now(),
        };

        Ok(Self {
            listener,
            router: build_router(state),
            supervisor,
        })
    }

    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or_default()
    }

    pub fn supervisor(&self) -> &SupervisorHandle {
        &self.supervisor
    }

    /// Serve until SIGTERM or SIGINT, then pass the signal on to the CRM
    /// backend.
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, forward its signal to the CRM backend
    /// once and return. Does not wait for the backend to exit.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ShutdownSignal>,
    {
        let port = self.port();
        tracing::info!("Production server running on port {}", port);
        tracing::info!("Website: http://localhost:{}", port);
        tracing::info!("Staff Portal: http://localhost:{}/staff-portal", port);
        tracing::info!("CRM API: http://localhost:{}/api/immigrantrus-crm", port);

        let signal = tokio::select! {
            result = axum::serve(self.listener, self.router) => {
                result?;
                return Ok(());
            }
            signal = shutdown => signal,
        };

        tracing::info!(%signal, "Received {}, shutting down gracefully", signal);
        let delivered = self.supervisor.shutdown(signal).await?;
        tracing::info!(delivered, "Shutdown complete");

        Ok(())
    }
}

pub async fn shutdown_signal() -> ShutdownSignal {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => ShutdownSignal::Interrupt,
        _ = terminate => ShutdownSignal::Terminate,
    }
}
