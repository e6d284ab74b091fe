use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use axum::{routing::get, Router};

use crate::error::SortError;
use crate::sorter::TransferResult;

pub const FILES_TOTAL: &str = "file_sorter_files_total";
pub const REJECTED_EVENTS_TOTAL: &str = "file_sorter_rejected_events_total";
pub const DESTINATIONS: &str = "file_sorter_destinations";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder and publish the size of the
    /// destination table as a static gauge.
    pub fn init(destinations: usize) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        gauge!(DESTINATIONS).set(destinations as f64);

        Ok(Self { handle })
    }

    /// `GET /metrics`: the sorter counters and the destination gauge in
    /// Prometheus text format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route("/metrics", get(move || render(handle.clone())))
    }
}

async fn render(handle: PrometheusHandle) -> String {
    handle.render()
}

/// Count one finished invocation. No-op until a recorder is installed.
pub fn record_result(result: &TransferResult, err: Option<&SortError>) {
    let outcome = match (err, result.dry_run) {
        (Some(e), _) => e.kind(),
        (None, true) => "dry_run",
        (None, false) => "copied",
    };
    let instrument = result.instrument.map(|i| i.code()).unwrap_or("unknown");
    counter!(FILES_TOTAL, "outcome" => outcome, "instrument" => instrument).increment(1);
}

pub fn record_rejected_event() {
    counter!(REJECTED_EVENTS_TOTAL).increment(1);
}
