//! Prometheus counters for the vault lifecycle, exposed at `/metrics`
//! on the main router.

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};
use std::sync::OnceLock;
use tracing::info;

static VAULTS_CREATED: OnceLock<IntCounter> = OnceLock::new();
static VAULTS_UNLOCKED: OnceLock<IntCounter> = OnceLock::new();
static SWEEP_RUNS: OnceLock<IntCounter> = OnceLock::new();
static ACCESS_DENIED: OnceLock<IntCounter> = OnceLock::new();

pub fn init_monitoring() -> Result<()> {
    VAULTS_CREATED
        .set(register_int_counter!(
            "timelock_vaults_created_total",
            "Total number of vaults registered"
        )?)
        .map_err(|_| anyhow::anyhow!("Failed to register VAULTS_CREATED"))?;

    VAULTS_UNLOCKED
        .set(register_int_counter!(
            "timelock_vaults_unlocked_total",
            "Total number of vaults flipped to UNLOCKED by the sweep"
        )?)
        .map_err(|_| anyhow::anyhow!("Failed to register VAULTS_UNLOCKED"))?;

    SWEEP_RUNS
        .set(register_int_counter!(
            "timelock_sweep_runs_total",
            "Total number of unlock sweep invocations"
        )?)
        .map_err(|_| anyhow::anyhow!("Failed to register SWEEP_RUNS"))?;

    ACCESS_DENIED
        .set(register_int_counter!(
            "timelock_access_denied_total",
            "Total number of rejected vault access attempts"
        )?)
        .map_err(|_| anyhow::anyhow!("Failed to register ACCESS_DENIED"))?;

    info!("Monitoring system initialized");
    Ok(())
}

pub fn record_vault_created() {
    if let Some(counter) = VAULTS_CREATED.get() {
        counter.inc();
    }
}

pub fn record_vaults_unlocked(count: u64) {
    if let Some(counter) = VAULTS_UNLOCKED.get() {
        counter.inc_by(count);
    }
}

pub fn record_sweep_run() {
    if let Some(counter) = SWEEP_RUNS.get() {
        counter.inc();
    }
}

pub fn record_access_denied() {
    if let Some(counter) = ACCESS_DENIED.get() {
        counter.inc();
    }
}

/// GET /metrics
pub async fn metrics_handler() -> Result<Response, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buffer))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_init_does_not_panic() {
        record_vault_created();
        record_vaults_unlocked(3);
        record_sweep_run();
        record_access_denied();
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        // init may have run in another test already; both outcomes are fine.
        let _ = init_monitoring();
        record_sweep_run();
        let response = metrics_handler().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert_eq!(content_type, TextEncoder::new().format_type());
    }
}
