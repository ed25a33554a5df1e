pub mod config;
pub mod handlers;
pub mod services;
pub mod startup;
pub mod supervisor;

use config::OrchestratorConfig;
use services::CrmApi;
use std::sync::Arc;
use std::time::Instant;
use supervisor::SupervisorHandle;

/// Shared application state. The supervisor handle is read-only from the
/// router's point of view.
#[derive(Clone)]
pub struct AppState {
    pub config: OrchestratorConfig,
    pub supervisor: SupervisorHandle,
    pub crm_api: Arc<dyn CrmApi>,
    pub http: reqwest::Client,
    pub started_at: Instant,
}
