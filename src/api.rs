use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::DetectorConfig;
use crate::corpus::{self, Document};
use crate::detector::{Detector, PredictionResult};
use crate::error::DetectorError;
use crate::rules::{RuleScore, Verdict};

#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<Detector>,
    pub config: Arc<DetectorConfig>,
}

impl AppState {
    pub fn new(config: DetectorConfig, detector: Detector) -> Self {
        Self {
            detector: Arc::new(detector),
            config: Arc::new(config),
        }
    }

    /// Config from env/file, detector bound to the configured model store.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = DetectorConfig::from_env()?;
        let detector = Detector::from_config(&config);
        Ok(Self::new(config, detector))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/predict", post(predict))
        .route("/score", post(score))
        .route("/admin/reload", post(admin_reload))
        .route("/admin/retrain", post(admin_retrain))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(StatusCode, String);

impl From<DetectorError> for ApiError {
    fn from(e: DetectorError) -> Self {
        let status = match e {
            DetectorError::EmptyInput | DetectorError::InputTooLarge { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DetectorError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DetectorError::NotFitted | DetectorError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorBody { error: self.1 })).into_response()
    }
}

async fn predict(
    State(state): State<AppState>,
    Json(doc): Json<Document>,
) -> Result<Json<PredictionResult>, ApiError> {
    Ok(Json(state.detector.predict_document(&doc)?))
}

#[derive(Serialize)]
struct ScoreResp {
    verdict: Verdict,
    hits: Vec<String>,
    confidence: f64,
}

impl From<RuleScore> for ScoreResp {
    fn from(rs: RuleScore) -> Self {
        Self {
            confidence: rs.confidence(),
            verdict: rs.verdict,
            hits: rs.hits,
        }
    }
}

async fn score(
    State(state): State<AppState>,
    Json(doc): Json<Document>,
) -> Result<Json<ScoreResp>, ApiError> {
    let rs = state.detector.score_rules(&doc.headline, &doc.article)?;
    Ok(Json(rs.into()))
}

#[derive(Serialize)]
struct AdminResp {
    status: &'static str,
    model_loaded: bool,
}

async fn admin_reload(State(state): State<AppState>) -> Result<Json<AdminResp>, ApiError> {
    let registry = state.detector.registry().clone();
    // Waits behind any retrain in progress.
    let res = tokio::task::spawn_blocking(move || registry.reload())
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if let Err(e) = res {
        warn!(error = %e, "reload failed; previous model kept");
        return Err(e.into());
    }
    Ok(Json(AdminResp {
        status: "reloaded",
        model_loaded: state.detector.registry().is_loaded(),
    }))
}

#[derive(Deserialize, Default)]
struct RetrainReq {
    /// Train on the built-in demo corpus instead of the configured corpus files.
    #[serde(default)]
    demo: bool,
}

async fn admin_retrain(
    State(state): State<AppState>,
    body: Option<Json<RetrainReq>>,
) -> Result<Json<AdminResp>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let cfg = state.config.clone();
    let detector = state.detector.clone();

    let res = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let docs = if req.demo {
            corpus::demo_corpus()
        } else {
            match (&cfg.model.fake_corpus, &cfg.model.real_corpus) {
                (Some(fake), Some(real)) => corpus::load_pair(fake, real)?,
                _ => anyhow::bail!("model.fake_corpus and model.real_corpus must be configured"),
            }
        };
        detector
            .registry()
            .retrain(&docs, &cfg.features, &cfg.classifier)
    })
    .await
    .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if let Err(e) = res {
        warn!(error = %format!("{e:#}"), "retrain failed; previous model kept");
        return Err(ApiError(StatusCode::BAD_REQUEST, format!("{e:#}")));
    }
    info!("retrained model published");
    Ok(Json(AdminResp {
        status: "retrained",
        model_loaded: state.detector.registry().is_loaded(),
    }))
}
