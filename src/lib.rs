// src/lib.rs
// Public library surface for the service binary, the trainer, and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;

// Classification core
pub mod classifier;
pub mod corpus;
pub mod detector;
pub mod explain;
pub mod features;
pub mod model;
pub mod registry;
pub mod rules;
pub mod tokenize;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::classifier::Label;
pub use crate::config::DetectorConfig;
pub use crate::detector::{Detector, PredictionMode, PredictionResult};
pub use crate::error::DetectorError;
pub use crate::registry::ModelRegistry;

/// Build the full in-process app (API + `/metrics`) from env/config.
/// Used by the Shuttle entrypoint and by tests that want the real wiring.
pub fn app() -> anyhow::Result<axum::Router> {
    // Recorder first, so the initial model load is counted.
    let metrics = crate::metrics::Metrics::init()?;
    let state = AppState::from_env()?;
    registry::start_hot_reload_thread(state.detector.registry().clone());
    Ok(router(state).merge(metrics.router()))
}
