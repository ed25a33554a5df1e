use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: ServiceHealth,
    pub timestamp: String,
    /// Seconds since the orchestrator started.
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub website: &'static str,
    pub twentycrm: &'static str,
    pub database: &'static str,
    pub redis: &'static str,
}

fn configured(present: bool) -> &'static str {
    if present {
        "configured"
    } else {
        "not configured"
    }
}

/// Liveness probe. Always 200: the site is up even while the CRM backend is
/// still starting or being restarted.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let crm = state.supervisor.current_status();
    let datastores = &state.config.datastores;

    Json(HealthResponse {
        status: "healthy",
        services: ServiceHealth {
            website: "running",
            twentycrm: if crm.is_live() { "running" } else { "starting" },
            database: configured(datastores.database_configured()),
            redis: configured(datastores.redis_configured()),
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}
