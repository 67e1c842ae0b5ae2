//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and records domain counters.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::models::InvoiceStatus;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_invoice_created(status: InvoiceStatus) {
    counter!("invoice_invoices_created_total", "status" => status.as_str()).increment(1);
}

pub fn record_invoice_deleted() {
    counter!("invoice_invoices_deleted_total").increment(1);
}

pub fn record_number_collision() {
    counter!("invoice_number_collisions_total").increment(1);
}

pub fn record_auth_attempt(kind: &'static str, outcome: &'static str) {
    counter!("invoice_auth_attempts_total", "kind" => kind, "outcome" => outcome).increment(1);
}
