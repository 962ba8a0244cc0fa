//! Orchestrator: the only entry point the UI layer calls.
//!
//! Order:
//! 1) validate input (empty → error, oversize → truncate or reject per config)
//! 2) trained model present → features + Naive Bayes
//!    otherwise             → keyword rules (degraded mode)
//! 3) static explanation keyed by the label, links templated from the query

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::Label;
use crate::config::{DetectorConfig, InputConfig, Overflow};
use crate::corpus::{self, Document};
use crate::error::{DetectorError, Result};
use crate::explain::{self, SourceLink};
use crate::metrics;
use crate::model::{ModelStore, TrainedModel};
use crate::registry::ModelRegistry;
use crate::rules::{KeywordScorer, RuleScore, Verdict};
use crate::tokenize;

/// Longest article prefix used as a search query when there is no headline.
const QUERY_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMode {
    Model,
    Rules,
}

impl PredictionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PredictionMode::Model => "model",
            PredictionMode::Rules => "rules",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: Label,
    /// In [0, 1]. Posterior for the model path, heuristic score for the rules path.
    pub confidence: f64,
    pub mode: PredictionMode,
    /// Three-way verdict, only on the rules path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keyword_hits: Vec<String>,
    pub reasoning: String,
    pub advice: String,
    pub sources: Vec<SourceLink>,
    pub references: Vec<SourceLink>,
    /// Input was cut to the configured maximum before scoring.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct Detector {
    input: InputConfig,
    scorer: KeywordScorer,
    registry: ModelRegistry,
}

impl Detector {
    pub fn new(cfg: &DetectorConfig, registry: ModelRegistry) -> Self {
        metrics::set_model_loaded(registry.is_loaded());
        Self {
            input: cfg.input.clone(),
            scorer: KeywordScorer::new(&cfg.rules),
            registry,
        }
    }

    /// Bind to the configured model store. A missing or corrupt store is not fatal:
    /// the detector starts in keyword-rules mode (or on the demo model if configured).
    pub fn from_config(cfg: &DetectorConfig) -> Self {
        let store = ModelStore::new(&cfg.model.store_dir);
        let (registry, loaded) = ModelRegistry::load(store);

        if let Err(e) = loaded {
            warn!(error = %e, "model unavailable; falling back to keyword rules");
            if cfg.model.train_demo_if_missing {
                match TrainedModel::train(
                    &corpus::demo_corpus(),
                    &cfg.features,
                    &cfg.classifier,
                ) {
                    Ok(m) => {
                        info!("serving built-in demo model");
                        registry.publish(m);
                    }
                    Err(e) => warn!(error = %e, "demo model training failed"),
                }
            }
        }
        Self::new(cfg, registry)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn scorer(&self) -> &KeywordScorer {
        &self.scorer
    }

    pub fn predict_document(&self, doc: &Document) -> Result<PredictionResult> {
        self.predict(&doc.headline, &doc.article)
    }

    /// Classify headline + article. Fails only on input validation.
    pub fn predict(&self, headline: &str, article: &str) -> Result<PredictionResult> {
        let (text, truncated) = self.prepare(headline, article)?;
        let id = anon_hash(&text);
        let query = search_query(headline, article);

        let result = match self.registry.current() {
            Some(model) => {
                let p = model.predict(&text);
                self.finish(p.label, p.confidence, PredictionMode::Model, None, &query, truncated)
            }
            None => {
                debug!(%id, "no trained model, scoring with keyword rules");
                let rs = self.scorer.score(&text);
                self.from_rules(rs, &query, truncated)
            }
        };

        metrics::record_prediction(result.mode.as_str(), label_str(result.label));
        debug!(
            %id,
            mode = result.mode.as_str(),
            label = %result.label,
            confidence = result.confidence,
            truncated,
            "prediction"
        );
        Ok(result)
    }

    /// Keyword rules only, regardless of model availability.
    pub fn score_rules(&self, headline: &str, article: &str) -> Result<RuleScore> {
        let (text, _) = self.prepare(headline, article)?;
        Ok(self.scorer.score(&text))
    }

    fn from_rules(&self, rs: RuleScore, query: &str, truncated: bool) -> PredictionResult {
        let label = match rs.verdict {
            Verdict::Real => Label::Real,
            Verdict::PossiblyFake | Verdict::Fake => Label::Fake,
        };
        let mut out = self.finish(
            label,
            rs.confidence(),
            PredictionMode::Rules,
            Some(rs.verdict),
            query,
            truncated,
        );
        out.reasoning = explain::rule_reasoning(rs.verdict).to_string();
        out.keyword_hits = rs.hits;
        out
    }

    fn finish(
        &self,
        label: Label,
        confidence: f64,
        mode: PredictionMode,
        verdict: Option<Verdict>,
        query: &str,
        truncated: bool,
    ) -> PredictionResult {
        let ex = explain::explain(label, query);
        PredictionResult {
            label,
            confidence: confidence.clamp(0.0, 1.0),
            mode,
            verdict,
            keyword_hits: Vec::new(),
            reasoning: ex.reasoning,
            advice: ex.advice,
            sources: ex.sources,
            references: explain::reference_sites(),
            truncated,
        }
    }

    fn prepare(&self, headline: &str, article: &str) -> Result<(String, bool)> {
        let text = tokenize::combine(headline, article);
        if text.is_empty() {
            metrics::record_rejected(DetectorError::EmptyInput.kind());
            return Err(DetectorError::EmptyInput);
        }

        let max = self.input.max_chars;
        match text.char_indices().nth(max) {
            None => Ok((text, false)),
            Some(_) if self.input.overflow == Overflow::Reject => {
                let err = DetectorError::InputTooLarge {
                    len: text.chars().count(),
                    max,
                };
                metrics::record_rejected(err.kind());
                Err(err)
            }
            Some((cut, _)) => Ok((text[..cut].to_string(), true)),
        }
    }
}

fn label_str(label: Label) -> &'static str {
    match label {
        Label::Real => "REAL",
        Label::Fake => "FAKE",
    }
}

/// The headline when there is one, otherwise a prefix of the article.
fn search_query(headline: &str, article: &str) -> String {
    let h = headline.trim();
    if !h.is_empty() {
        return h.to_string();
    }
    article.trim().chars().take(QUERY_MAX_CHARS).collect()
}

// Requests are logged by a short digest, never by raw text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;

    fn demo_detector(cfg: &DetectorConfig) -> Detector {
        let model =
            TrainedModel::train(&corpus::demo_corpus(), &cfg.features, &ClassifierConfig::default())
                .unwrap();
        Detector::new(cfg, ModelRegistry::with_model(model))
    }

    #[test]
    fn model_path_scenario_a() {
        let d = demo_detector(&DetectorConfig::default());
        let r = d.predict("Miracle cure found", "").unwrap();
        assert_eq!(r.mode, PredictionMode::Model);
        assert_eq!(r.label, Label::Fake);
        assert!(r.confidence > 0.5);
        assert!(r.verdict.is_none());
        assert_eq!(r.reasoning, explain::reasoning(Label::Fake));
        assert_eq!(r.sources.len(), 4);
        assert!(r.sources[0].url.ends_with("Miracle%20cure%20found"));
    }

    #[test]
    fn blank_input_is_rejected() {
        let d = Detector::new(&DetectorConfig::default(), ModelRegistry::empty());
        assert!(matches!(d.predict("", ""), Err(DetectorError::EmptyInput)));
        assert!(matches!(d.predict("  ", "\n\t"), Err(DetectorError::EmptyInput)));
    }

    #[test]
    fn rules_path_without_model() {
        let d = Detector::new(&DetectorConfig::default(), ModelRegistry::empty());
        let r = d.predict("Shocking secret revealed", "").unwrap();
        assert_eq!(r.mode, PredictionMode::Rules);
        assert_eq!(r.verdict, Some(Verdict::Fake));
        assert_eq!(r.label, Label::Fake);
        assert_eq!(r.keyword_hits, vec!["shocking", "secret"]);
        assert_eq!(r.reasoning, explain::rule_reasoning(Verdict::Fake));

        let r = d.predict("", "Council approves budget").unwrap();
        assert_eq!(r.label, Label::Real);
        assert_eq!(r.verdict, Some(Verdict::Real));
        assert!((0.0..=1.0).contains(&r.confidence));
    }

    #[test]
    fn possibly_fake_maps_to_fake_label() {
        let d = Detector::new(&DetectorConfig::default(), ModelRegistry::empty());
        let r = d.predict("Banned book returns", "").unwrap();
        assert_eq!(r.verdict, Some(Verdict::PossiblyFake));
        assert_eq!(r.label, Label::Fake);
        assert_eq!(r.advice, explain::advice(Label::Fake));
    }

    #[test]
    fn oversize_input_truncates_or_rejects() {
        let mut cfg = DetectorConfig::default();
        cfg.input.max_chars = 10;
        let d = Detector::new(&cfg, ModelRegistry::empty());
        let r = d.predict("ééééé ééééé ééééé", "").unwrap();
        assert!(r.truncated);
        // Keywords past the cut are not seen.
        let r = d.predict("aaaaaaaaaa secret miracle", "").unwrap();
        assert_eq!(r.verdict, Some(Verdict::Real));

        cfg.input.overflow = Overflow::Reject;
        let d = Detector::new(&cfg, ModelRegistry::empty());
        assert!(matches!(
            d.predict("0123456789X", ""),
            Err(DetectorError::InputTooLarge { len: 11, max: 10 })
        ));
        assert!(!d.predict("0123456789", "").unwrap().truncated);
    }

    #[test]
    fn zero_vector_is_defined_not_an_error() {
        let d = demo_detector(&DetectorConfig::default());
        let a = d.predict("zzz qqq", "").unwrap();
        let b = d.predict("zzz qqq", "").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.confidence, 0.5);
    }

    #[test]
    fn query_prefers_headline() {
        assert_eq!(search_query(" Head ", "body"), "Head");
        assert_eq!(search_query("", &"x".repeat(500)).len(), QUERY_MAX_CHARS);
    }

    #[test]
    fn anon_hash_is_short_and_stable() {
        assert_eq!(anon_hash("abc").len(), 12);
        assert_eq!(anon_hash("abc"), anon_hash("abc"));
        assert_ne!(anon_hash("abc"), anon_hash("abd"));
    }
}
