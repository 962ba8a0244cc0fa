//! Trained model (vocabulary + class statistics) and its on-disk store.
//!
//! The store is a directory with two JSON artifacts:
//! - `extractor.json`: feature config, vocabulary in index order, optional IDF table
//! - `classifier.json`: smoothing, per-class prior and log conditional weights
//!
//! `serde_json` writes floats in shortest round-trip form, so a reload reproduces every weight
//! bit for bit. Artifacts are written to a temp file and renamed; `classifier.json` goes last
//! so a watcher keyed on it never sees a half-written pair.
//!
//! Both artifacts carry the same `model_id`, a SHA-256 digest over the extractor and classifier
//! state. A pair whose ids differ came from two different saves and is rejected on load.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::info;

use crate::classifier::{ClassPrediction, ClassStatistics, Label, NaiveBayes};
use crate::config::{ClassifierConfig, FeaturesConfig};
use crate::corpus::LabeledDocument;
use crate::error::{DetectorError, Result};
use crate::features::{FeatureExtractor, FeatureVector, FittedExtractor};

pub const EXTRACTOR_FILE: &str = "extractor.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";
const FORMAT_VERSION: u32 = 2;

/// Immutable result of one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    features: FeaturesConfig,
    extractor: FittedExtractor,
    statistics: ClassStatistics,
}

impl TrainedModel {
    /// Fit the extractor, vectorize the corpus, train the classifier.
    /// Any degenerate input aborts here, before a model exists to publish.
    pub fn train(
        corpus: &[LabeledDocument],
        features: &FeaturesConfig,
        classifier: &ClassifierConfig,
    ) -> Result<Self> {
        let mut fx = FeatureExtractor::new(features.clone());
        fx.fit(corpus.iter().map(|d| d.text.as_str()))?;

        let vectors = corpus
            .iter()
            .map(|d| fx.transform(&d.text))
            .collect::<Result<Vec<_>>>()?;
        let labels: Vec<Label> = corpus.iter().map(|d| d.label).collect();
        let statistics = NaiveBayes::new(classifier).train(&vectors, &labels)?;

        let extractor = fx.fitted().cloned().ok_or(DetectorError::NotFitted)?;
        info!(
            documents = corpus.len(),
            vocabulary = extractor.vocabulary.len(),
            use_idf = features.use_idf,
            smoothing = classifier.smoothing,
            "model trained"
        );
        Ok(Self {
            features: features.clone(),
            extractor,
            statistics,
        })
    }

    pub fn features(&self) -> &FeaturesConfig {
        &self.features
    }

    pub fn extractor(&self) -> &FittedExtractor {
        &self.extractor
    }

    pub fn statistics(&self) -> &ClassStatistics {
        &self.statistics
    }

    pub fn vocabulary_len(&self) -> usize {
        self.extractor.vocabulary.len()
    }

    pub fn vectorize(&self, text: &str) -> FeatureVector {
        self.extractor.transform(text)
    }

    pub fn predict(&self, text: &str) -> ClassPrediction {
        self.statistics.predict(&self.vectorize(text))
    }

    /// Hex SHA-256 over the serialized extractor state and class statistics.
    pub fn model_id(&self) -> serde_json::Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&self.features)?);
        hasher.update(serde_json::to_vec(&self.extractor)?);
        hasher.update(serde_json::to_vec(&self.statistics)?);
        Ok(hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect())
    }

    fn from_parts(ex: ExtractorArtifact, cl: ClassifierArtifact) -> std::result::Result<Self, String> {
        for v in [ex.format_version, cl.format_version] {
            if v != FORMAT_VERSION {
                return Err(format!("unsupported format_version {v}"));
            }
        }
        if ex.model_id != cl.model_id {
            return Err(format!(
                "artifacts belong to different models (extractor {}, classifier {})",
                short_id(&ex.model_id),
                short_id(&cl.model_id)
            ));
        }
        ex.extractor.check()?;
        cl.statistics.check(ex.extractor.vocabulary.len())?;
        Ok(Self {
            features: ex.features,
            extractor: ex.extractor,
            statistics: cl.statistics,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ExtractorArtifact {
    format_version: u32,
    model_id: String,
    features: FeaturesConfig,
    extractor: FittedExtractor,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassifierArtifact {
    format_version: u32,
    model_id: String,
    statistics: ClassStatistics,
}

/// Directory holding the two artifacts.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extractor_path(&self) -> PathBuf {
        self.dir.join(EXTRACTOR_FILE)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(CLASSIFIER_FILE)
    }

    pub fn exists(&self) -> bool {
        self.extractor_path().is_file() && self.classifier_path().is_file()
    }

    pub fn save(&self, model: &TrainedModel) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create model dir {}", self.dir.display()))?;

        let model_id = model.model_id()?;
        let ex = ExtractorArtifact {
            format_version: FORMAT_VERSION,
            model_id: model_id.clone(),
            features: model.features.clone(),
            extractor: model.extractor.clone(),
        };
        let cl = ClassifierArtifact {
            format_version: FORMAT_VERSION,
            model_id: model_id.clone(),
            statistics: model.statistics.clone(),
        };
        write_atomic(&self.extractor_path(), &serde_json::to_vec_pretty(&ex)?)?;
        write_atomic(&self.classifier_path(), &serde_json::to_vec_pretty(&cl)?)?;
        info!(
            dir = %self.dir.display(),
            model_id = short_id(&model_id),
            "model store written"
        );
        Ok(())
    }

    /// Missing, unreadable, or inconsistent artifacts all map to `ModelUnavailable`.
    pub fn load(&self) -> Result<TrainedModel> {
        let ex: ExtractorArtifact = read_json(&self.extractor_path())?;
        let cl: ClassifierArtifact = read_json(&self.classifier_path())?;
        TrainedModel::from_parts(ex, cl).map_err(|reason| DetectorError::unavailable(&self.dir, reason))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| DetectorError::unavailable(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| DetectorError::unavailable(path, e))
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Temp names are unique per process and per write, so concurrent savers never share one.
fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::demo_corpus;

    fn unique_tmp_dir(tag: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("model_test_{tag}_{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn demo(use_idf: bool) -> TrainedModel {
        TrainedModel::train(
            &demo_corpus(),
            &FeaturesConfig {
                use_idf,
                ..Default::default()
            },
            &ClassifierConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn demo_model_flags_miracle_cure() {
        let p = demo(false).predict("Miracle cure found");
        assert_eq!(p.label, Label::Fake);
        assert!(p.confidence > 0.5);
    }

    #[test]
    fn training_twice_is_identical() {
        assert_eq!(demo(true), demo(true));
    }

    #[test]
    fn save_then_load_is_exact() {
        for use_idf in [false, true] {
            let dir = unique_tmp_dir("roundtrip");
            let store = ModelStore::new(&dir);
            let model = demo(use_idf);
            store.save(&model).unwrap();
            assert!(store.exists());

            let loaded = store.load().unwrap();
            assert_eq!(loaded, model);
            assert_eq!(
                loaded.predict("steady policy growth"),
                model.predict("steady policy growth")
            );
            let _ = fs::remove_dir_all(&dir);
        }
    }

    #[test]
    fn missing_store_is_unavailable() {
        let store = ModelStore::new(std::env::temp_dir().join("model_test_does_not_exist"));
        assert!(!store.exists());
        assert!(matches!(
            store.load(),
            Err(DetectorError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn truncated_or_mismatched_store_is_unavailable() {
        let dir = unique_tmp_dir("corrupt");
        let store = ModelStore::new(&dir);
        store.save(&demo(false)).unwrap();

        fs::write(store.classifier_path(), b"{\"format_version\": 1, \"statis").unwrap();
        assert!(matches!(
            store.load(),
            Err(DetectorError::ModelUnavailable { .. })
        ));

        // Valid JSON, but weights no longer line up with the vocabulary.
        let mut other = demo(false);
        other.statistics.classes[0].log_conditional.pop();
        let cl = ClassifierArtifact {
            format_version: FORMAT_VERSION,
            model_id: demo(false).model_id().unwrap(),
            statistics: other.statistics,
        };
        fs::write(store.classifier_path(), serde_json::to_vec(&cl).unwrap()).unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("weights"), "{err}");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn classifier_from_another_store_is_rejected() {
        let corpus = demo_corpus();
        let swapped: Vec<LabeledDocument> = corpus
            .iter()
            .map(|d| {
                let label = match d.label {
                    Label::Fake => Label::Real,
                    Label::Real => Label::Fake,
                };
                LabeledDocument::new(d.text.clone(), label)
            })
            .collect();
        let cfg_f = FeaturesConfig::default();
        let cfg_c = ClassifierConfig::default();
        let a = TrainedModel::train(&corpus, &cfg_f, &cfg_c).unwrap();
        let b = TrainedModel::train(&swapped, &cfg_f, &cfg_c).unwrap();
        assert_eq!(a.vocabulary_len(), b.vocabulary_len());
        assert_ne!(a.model_id().unwrap(), b.model_id().unwrap());

        let dir_a = unique_tmp_dir("pair_a");
        let dir_b = unique_tmp_dir("pair_b");
        let store_a = ModelStore::new(&dir_a);
        let store_b = ModelStore::new(&dir_b);
        store_a.save(&a).unwrap();
        store_b.save(&b).unwrap();
        assert_eq!(store_a.load().unwrap(), a);

        fs::copy(store_b.classifier_path(), store_a.classifier_path()).unwrap();
        let err = store_a.load().unwrap_err();
        assert!(matches!(err, DetectorError::ModelUnavailable { .. }));
        assert!(err.to_string().contains("different models"), "{err}");

        let _ = fs::remove_dir_all(&dir_a);
        let _ = fs::remove_dir_all(&dir_b);
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = unique_tmp_dir("tmpnames");
        let store = ModelStore::new(&dir);
        store.save(&demo(false)).unwrap();
        store.save(&demo(true)).unwrap();
        let mut names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![CLASSIFIER_FILE, EXTRACTOR_FILE]);
        let _ = fs::remove_dir_all(&dir);
    }
}
