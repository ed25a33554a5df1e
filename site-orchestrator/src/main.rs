use service_core::observability::{init_metrics, init_tracing};
use site_orchestrator::config::OrchestratorConfig;
use site_orchestrator::startup::Application;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OrchestratorConfig::load().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "site-orchestrator",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!("Starting production server with TwentyCRM integration");

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    // Exit right away; the CRM backend finishes shutting down on its own.
    std::process::exit(0);
}
