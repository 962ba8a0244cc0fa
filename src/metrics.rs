use axum::{routing::get, Router};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process; later calls reuse the handle.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
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

/// `mode` is "model" or "rules"; `label` is "REAL" / "FAKE".
pub fn record_prediction(mode: &'static str, label: &'static str) {
    counter!("detector_predictions_total", "mode" => mode, "label" => label).increment(1);
}

pub fn record_rejected(reason: &'static str) {
    counter!("detector_rejected_inputs_total", "reason" => reason).increment(1);
}

pub fn set_model_loaded(loaded: bool) {
    gauge!("detector_model_loaded").set(if loaded { 1.0 } else { 0.0 });
}
