//! Multinomial Naive Bayes over feature vectors.
//!
//! Training, per class c:
//!   prior(c)      = docs(c) / docs
//!   cond(t | c)   = (alpha + occ(t, c)) / (alpha * |V| + occ(*, c))
//! where `occ` sums the (possibly IDF-weighted) feature weights.
//!
//! Prediction:
//!   score(c) = ln prior(c) + sum_t w_t * ln cond(t | c)
//! normalized with a max-shifted softmax. An all-zero vector therefore returns the priors.
//! Ties resolve to `Real`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ClassifierConfig;
use crate::error::{DetectorError, Result};
use crate::features::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    /// Fixed class order used by `ClassStatistics`.
    pub const ALL: [Label; 2] = [Label::Real, Label::Fake];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REAL" | "TRUE" => Some(Label::Real),
            "FAKE" | "FALSE" => Some(Label::Fake),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Label::Real => "REAL",
            Label::Fake => "FAKE",
        })
    }
}

/// Per-class parameters learned from the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub label: Label,
    pub documents: usize,
    pub prior: f64,
    /// ln cond(t | c), indexed like the vocabulary.
    pub log_conditional: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStatistics {
    pub smoothing: f64,
    /// One entry per `Label::ALL`, in that order.
    pub classes: Vec<ClassStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassPrediction {
    pub label: Label,
    /// Normalized posterior of `label`, in [0, 1].
    pub confidence: f64,
    /// Posterior of `Label::Fake`.
    pub p_fake: f64,
}

#[derive(Debug, Clone)]
pub struct NaiveBayes {
    smoothing: f64,
}

impl NaiveBayes {
    pub fn new(cfg: &ClassifierConfig) -> Self {
        Self {
            smoothing: cfg.smoothing,
        }
    }

    pub fn train(&self, vectors: &[FeatureVector], labels: &[Label]) -> Result<ClassStatistics> {
        if !(self.smoothing.is_finite() && self.smoothing > 0.0) {
            return Err(DetectorError::Configuration(format!(
                "smoothing must be > 0, got {}",
                self.smoothing
            )));
        }
        if vectors.len() != labels.len() {
            return Err(DetectorError::Configuration(format!(
                "{} feature vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        let dim = match vectors.first() {
            Some(v) => v.len(),
            None => {
                return Err(DetectorError::Configuration(
                    "cannot train on zero examples".into(),
                ))
            }
        };
        if dim == 0 || vectors.iter().any(|v| v.len() != dim) {
            return Err(DetectorError::Configuration(
                "feature vectors must share one non-zero length".into(),
            ));
        }

        let total = vectors.len() as f64;
        let mut classes = Vec::with_capacity(Label::ALL.len());
        for label in Label::ALL {
            let mut documents = 0usize;
            let mut occ = vec![0.0f64; dim];
            for (v, _) in vectors.iter().zip(labels).filter(|(_, l)| **l == label) {
                documents += 1;
                for (o, w) in occ.iter_mut().zip(v.weights()) {
                    *o += w;
                }
            }
            if documents == 0 {
                return Err(DetectorError::Configuration(format!(
                    "no training examples for class {label}; prior is undefined"
                )));
            }

            let occ_total: f64 = occ.iter().sum();
            let denom = self.smoothing * dim as f64 + occ_total;
            let log_conditional = occ
                .iter()
                .map(|o| ((self.smoothing + o) / denom).ln())
                .collect();

            classes.push(ClassStats {
                label,
                documents,
                prior: documents as f64 / total,
                log_conditional,
            });
        }

        Ok(ClassStatistics {
            smoothing: self.smoothing,
            classes,
        })
    }
}

impl ClassStatistics {
    pub fn dimension(&self) -> usize {
        self.classes
            .first()
            .map(|c| c.log_conditional.len())
            .unwrap_or(0)
    }

    /// Unnormalized log posterior per class, in `Label::ALL` order.
    pub fn log_posteriors(&self, v: &FeatureVector) -> Vec<(Label, f64)> {
        self.classes
            .iter()
            .map(|c| {
                let evidence: f64 = v
                    .nonzero()
                    .filter_map(|(i, w)| c.log_conditional.get(i).map(|lc| w * lc))
                    .sum();
                (c.label, c.prior.ln() + evidence)
            })
            .collect()
    }

    pub fn predict(&self, v: &FeatureVector) -> ClassPrediction {
        let scores = self.log_posteriors(v);
        let max = scores
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|(_, s)| (s - max).exp()).collect();
        let z: f64 = exp.iter().sum();

        let mut best = (Label::Real, 0.0f64);
        let mut p_fake = 0.0;
        for ((label, _), e) in scores.iter().zip(&exp) {
            let p = e / z;
            if *label == Label::Fake {
                p_fake = p;
            }
            if p > best.1 {
                best = (*label, p);
            }
        }

        ClassPrediction {
            label: best.0,
            confidence: best.1,
            p_fake,
        }
    }

    /// Shape checks for a reloaded classifier.
    pub(crate) fn check(&self, vocabulary_len: usize) -> std::result::Result<(), String> {
        let labels: Vec<Label> = self.classes.iter().map(|c| c.label).collect();
        if labels != Label::ALL {
            return Err(format!("expected classes {:?}, found {:?}", Label::ALL, labels));
        }
        if !(self.smoothing.is_finite() && self.smoothing > 0.0) {
            return Err(format!("invalid smoothing {}", self.smoothing));
        }
        for c in &self.classes {
            if c.log_conditional.len() != vocabulary_len {
                return Err(format!(
                    "class {} has {} weights, vocabulary has {}",
                    c.label,
                    c.log_conditional.len(),
                    vocabulary_len
                ));
            }
            if !(c.prior > 0.0 && c.prior < 1.0) {
                return Err(format!("class {} prior {} outside (0, 1)", c.label, c.prior));
            }
            if c.log_conditional.iter().any(|w| !w.is_finite() || *w > 0.0) {
                return Err(format!("class {} has invalid log weights", c.label));
            }
        }
        Ok(())
    }
}
