use invoice_service::config::InvoiceConfig;
use invoice_service::services::metrics::init_metrics;
use invoice_service::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = InvoiceConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    // Recorder must be installed before any metrics are recorded
    if let Err(e) = init_metrics() {
        tracing::error!("Metrics disabled: {}", e);
    }

    tracing::info!(
        environment = ?config.environment,
        store = ?config.store,
        "Starting {}",
        config.service_name
    );

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    app.run_until_stopped().await
}
