// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder (once) and describe our series.
    /// Counters emitted before this call, or without it, are no-ops.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("sources_submitted_total", "Sources accepted by POST /api/sources.");
    describe_counter!(
        "sources_rejected_total",
        "Submissions rejected by request validation."
    );
    describe_counter!("sources_listed_total", "Successful GET /api/sources lookups.");
    describe_counter!(
        "storage_errors_total",
        "Storage failures, labelled by retryable=true|false."
    );
    describe_counter!("rate_limited_total", "Requests refused by the rate limiter.");
    describe_counter!(
        "origin_rejected_total",
        "Requests refused by the origin allow-list."
    );
    describe_gauge!(
        "rate_limiter_clients",
        "Clients currently tracked by the rate limiter."
    );
}
