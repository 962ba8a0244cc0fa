//! Bag-of-words feature extraction with optional IDF weighting.
//!
//! `fit` assigns indices in first-seen order over the corpus (after the minimum-frequency
//! filter), so a fixed corpus order always yields the same vocabulary. `transform` maps a
//! text onto a vector of exactly `vocabulary.len()` non-negative weights; out-of-vocabulary
//! tokens are dropped.
//!
//! IDF = ln(N / (1 + df)) + 1. The `+ 1` keeps every weight strictly positive, even for a
//! token that appears in every document.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::config::FeaturesConfig;
use crate::error::{DetectorError, Result};
use crate::tokenize;

/// Token → index map, immutable once fit. Serialized as the ordered token list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn token(&self, idx: usize) -> Option<&str> {
        self.tokens.get(idx).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    fn push(&mut self, token: String) {
        if !self.index.contains_key(&token) {
            self.index.insert(token.clone(), self.tokens.len());
            self.tokens.push(token);
        }
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = String;

    fn try_from(tokens: Vec<String>) -> std::result::Result<Self, Self::Error> {
        let mut v = Vocabulary::default();
        for t in tokens {
            if v.index.contains_key(&t) {
                return Err(format!("duplicate vocabulary token `{t}`"));
            }
            v.push(t);
        }
        Ok(v)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(v: Vocabulary) -> Self {
        v.tokens
    }
}

/// One weight per vocabulary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub Vec<f64>);

impl FeatureVector {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn weights(&self) -> &[f64] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&w| w == 0.0)
    }

    /// (index, weight) pairs with non-zero weight.
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.0
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, w)| w != 0.0)
    }
}

/// Everything `transform` needs after fitting. This is what the model store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedExtractor {
    pub vocabulary: Vocabulary,
    /// Present only when fit with `use_idf`.
    pub idf: Option<Vec<f64>>,
    pub n_documents: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeaturesConfig,
    fitted: Option<FittedExtractor>,
}

impl FeatureExtractor {
    pub fn new(config: FeaturesConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn from_fitted(config: FeaturesConfig, fitted: FittedExtractor) -> Self {
        Self {
            config,
            fitted: Some(fitted),
        }
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }

    pub fn fitted(&self) -> Option<&FittedExtractor> {
        self.fitted.as_ref()
    }

    pub fn vocabulary(&self) -> Result<&Vocabulary> {
        self.fitted
            .as_ref()
            .map(|f| &f.vocabulary)
            .ok_or(DetectorError::NotFitted)
    }

    /// Build the vocabulary (and IDF table if enabled) from training texts.
    pub fn fit<'a, I>(&mut self, texts: I) -> Result<&Vocabulary>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let docs: Vec<Vec<String>> = texts.into_iter().map(tokenize::normalize).collect();
        if docs.is_empty() {
            return Err(DetectorError::Configuration(
                "cannot fit feature extractor on an empty corpus".into(),
            ));
        }

        // Pass 1: corpus-wide frequencies and document frequencies.
        let mut freq: HashMap<&str, usize> = HashMap::new();
        let mut df: HashMap<&str, usize> = HashMap::new();
        for doc in &docs {
            let mut seen: HashSet<&str> = HashSet::new();
            for tok in doc {
                *freq.entry(tok.as_str()).or_insert(0) += 1;
                if seen.insert(tok.as_str()) {
                    *df.entry(tok.as_str()).or_insert(0) += 1;
                }
            }
        }

        // Pass 2: first-seen order, filtered by minimum frequency.
        let min_freq = self.config.min_token_freq.max(1);
        let mut vocabulary = Vocabulary::default();
        for tok in docs.iter().flatten() {
            if freq.get(tok.as_str()).copied().unwrap_or(0) >= min_freq {
                vocabulary.push(tok.clone());
            }
        }
        if vocabulary.is_empty() {
            return Err(DetectorError::Configuration(format!(
                "vocabulary is empty after applying min_token_freq = {min_freq}"
            )));
        }

        let n = docs.len();
        let idf = self.config.use_idf.then(|| {
            vocabulary
                .tokens()
                .iter()
                .map(|t| idf_weight(n, df.get(t.as_str()).copied().unwrap_or(0)))
                .collect()
        });

        tracing::debug!(
            vocabulary = vocabulary.len(),
            documents = n,
            use_idf = self.config.use_idf,
            "feature extractor fit"
        );

        let fitted = self.fitted.insert(FittedExtractor {
            vocabulary,
            idf,
            n_documents: n,
        });
        Ok(&fitted.vocabulary)
    }

    /// Text → fixed-length weight vector. Errors only if never fit.
    pub fn transform(&self, text: &str) -> Result<FeatureVector> {
        let fitted = self.fitted.as_ref().ok_or(DetectorError::NotFitted)?;
        Ok(fitted.transform(text))
    }
}

impl FittedExtractor {
    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut v = FeatureVector::zeros(self.vocabulary.len());
        for tok in tokenize::tokens(text) {
            if let Some(i) = self.vocabulary.index_of(&tok) {
                v.0[i] += 1.0;
            }
        }
        if let Some(idf) = &self.idf {
            for (w, f) in v.0.iter_mut().zip(idf) {
                *w *= f;
            }
        }
        v
    }

    /// Shape checks for a reloaded extractor.
    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        if self.vocabulary.is_empty() {
            return Err("empty vocabulary".into());
        }
        if let Some(idf) = &self.idf {
            if idf.len() != self.vocabulary.len() {
                return Err(format!(
                    "idf length {} != vocabulary length {}",
                    idf.len(),
                    self.vocabulary.len()
                ));
            }
            if idf.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err("idf contains negative or non-finite weights".into());
            }
        }
        Ok(())
    }
}

fn idf_weight(n_documents: usize, df: usize) -> f64 {
    (n_documents as f64 / (1.0 + df as f64)).ln() + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: [&str; 4] = [
        "Breaking! Miracle cure found!",
        "Government releases new policy",
        "Viral rumor about celebrity",
        "Stock market shows steady growth",
    ];

    fn fit(cfg: FeaturesConfig) -> FeatureExtractor {
        let mut fx = FeatureExtractor::new(cfg);
        fx.fit(CORPUS.iter().copied()).unwrap();
        fx
    }

    #[test]
    fn indices_follow_first_seen_order() {
        let fx = fit(FeaturesConfig::default());
        let v = fx.vocabulary().unwrap();
        assert_eq!(v.len(), 17);
        assert_eq!(v.index_of("breaking"), Some(0));
        assert_eq!(v.index_of("miracle"), Some(1));
        assert_eq!(v.index_of("government"), Some(4));
        assert_eq!(v.token(16), Some("growth"));
    }

    #[test]
    fn transform_marks_every_token_of_a_training_doc() {
        for use_idf in [false, true] {
            let fx = fit(FeaturesConfig {
                use_idf,
                ..Default::default()
            });
            let vocab = fx.vocabulary().unwrap();
            for doc in CORPUS {
                let v = fx.transform(doc).unwrap();
                assert_eq!(v.len(), vocab.len());
                for tok in tokenize::normalize(doc) {
                    let i = vocab.index_of(&tok).unwrap();
                    assert!(v.weights()[i] > 0.0, "{tok} should be weighted (idf={use_idf})");
                }
            }
        }
    }

    #[test]
    fn unseen_tokens_are_ignored() {
        let fx = fit(FeaturesConfig::default());
        let v = fx.transform("completely unrelated words").unwrap();
        assert_eq!(v.len(), 17);
        assert!(v.is_zero());
    }

    #[test]
    fn term_frequency_counts_repeats() {
        let fx = fit(FeaturesConfig::default());
        let v = fx.transform("cure CURE cure miracle").unwrap();
        let vocab = fx.vocabulary().unwrap();
        assert_eq!(v.weights()[vocab.index_of("cure").unwrap()], 3.0);
        assert_eq!(v.weights()[vocab.index_of("miracle").unwrap()], 1.0);
        assert_eq!(v.nonzero().count(), 2);
    }

    #[test]
    fn idf_downweights_common_tokens_but_stays_positive() {
        let mut fx = FeatureExtractor::new(FeaturesConfig {
            use_idf: true,
            ..Default::default()
        });
        fx.fit(["news rare", "news", "news", "news"]).unwrap();
        let v = fx.transform("news rare").unwrap();
        let (news, rare) = (v.weights()[0], v.weights()[1]);
        assert!(news > 0.0);
        assert!(rare > news);
        assert!((rare - ((4.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn min_token_freq_filters_rare_tokens() {
        let mut fx = FeatureExtractor::new(FeaturesConfig {
            min_token_freq: 2,
            use_idf: false,
        });
        let vocab = fx.fit(["a b c", "b c d", "c e"]).unwrap();
        assert_eq!(vocab.tokens(), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn unfitted_transform_is_an_error() {
        let fx = FeatureExtractor::default();
        assert!(matches!(fx.transform("x"), Err(DetectorError::NotFitted)));
        assert!(matches!(fx.vocabulary(), Err(DetectorError::NotFitted)));
    }

    #[test]
    fn empty_corpus_and_empty_vocabulary_are_configuration_errors() {
        let mut fx = FeatureExtractor::default();
        let none: [&str; 0] = [];
        assert!(matches!(fx.fit(none), Err(DetectorError::Configuration(_))));
        assert!(matches!(fx.fit(["!!!", "..."]), Err(DetectorError::Configuration(_))));
    }

    #[test]
    fn vocabulary_rejects_duplicates_on_load() {
        let raw = r#"["a","b","a"]"#;
        assert!(serde_json::from_str::<Vocabulary>(raw).is_err());
        let ok: Vocabulary = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(ok.index_of("b"), Some(1));
    }
}
