//! Error taxonomy for the classification core.
//!
//! - `EmptyInput` / `InputTooLarge`: per-request validation, surfaced to the caller as a warning.
//! - `NotFitted`: feature extraction before `fit`; a wiring bug, caught at startup.
//! - `Configuration`: degenerate training data or knobs; training aborts before publishing.
//! - `ModelUnavailable`: missing/corrupt model store; the detector falls back to keyword rules.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("no usable text: headline and article are both empty")]
    EmptyInput,

    #[error("input too large: {len} chars (max {max})")]
    InputTooLarge { len: usize, max: usize },

    #[error("feature extractor used before fit")]
    NotFitted,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model unavailable at {}: {reason}", .path.display())]
    ModelUnavailable { path: PathBuf, reason: String },
}

impl DetectorError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModelUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short stable tag used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::InputTooLarge { .. } => "input_too_large",
            Self::NotFitted => "not_fitted",
            Self::Configuration(_) => "configuration",
            Self::ModelUnavailable { .. } => "model_unavailable",
        }
    }
}

pub type Result<T, E = DetectorError> = std::result::Result<T, E>;
