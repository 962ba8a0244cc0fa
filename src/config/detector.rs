// src/config/detector.rs
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::error::DetectorError;

// --- env defaults & names ---
pub const DEFAULT_DETECTOR_CONFIG_PATH: &str = "config/detector.toml";
pub const ENV_DETECTOR_CONFIG_PATH: &str = "DETECTOR_CONFIG_PATH";
pub const ENV_DETECTOR_MODEL_DIR: &str = "DETECTOR_MODEL_DIR";
pub const ENV_DETECTOR_MAX_CHARS: &str = "DETECTOR_MAX_CHARS";
pub const ENV_DETECTOR_USE_IDF: &str = "DETECTOR_USE_IDF";

fn default_keywords() -> Vec<String> {
    [
        "shocking",
        "secret",
        "breaking!!!",
        "miracle",
        "unbelievable",
        "banned",
        "hidden truth",
        "exposed",
        "100% guarantee",
        "cure",
        "conspiracy",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_fake_min_hits() -> usize {
    2
}
fn default_possibly_fake_min_hits() -> usize {
    1
}
fn default_min_token_freq() -> usize {
    1
}
fn default_smoothing() -> f64 {
    1.0
}
fn default_max_chars() -> usize {
    20_000
}
fn default_store_dir() -> PathBuf {
    PathBuf::from("model")
}

/// Full detector configuration (`config/detector.toml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Sensational substrings, matched case-insensitively. Each counts at most once.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_fake_min_hits")]
    pub fake_min_hits: usize,
    #[serde(default = "default_possibly_fake_min_hits")]
    pub possibly_fake_min_hits: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            fake_min_hits: default_fake_min_hits(),
            possibly_fake_min_hits: default_possibly_fake_min_hits(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Tokens seen fewer times than this across the corpus stay out of the vocabulary.
    #[serde(default = "default_min_token_freq")]
    pub min_token_freq: usize,
    #[serde(default)]
    pub use_idf: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            min_token_freq: default_min_token_freq(),
            use_idf: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Laplace smoothing constant (alpha).
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            smoothing: default_smoothing(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    #[default]
    Truncate,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default)]
    pub overflow: Overflow,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overflow: Overflow::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    #[serde(default)]
    pub fake_corpus: Option<PathBuf>,
    #[serde(default)]
    pub real_corpus: Option<PathBuf>,
    /// Train on the built-in demo corpus when the store is missing.
    #[serde(default)]
    pub train_demo_if_missing: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            fake_corpus: None,
            real_corpus: None,
            train_demo_if_missing: false,
        }
    }
}

impl DetectorConfig {
    /// Load from `DETECTOR_CONFIG_PATH` (or `config/detector.toml`), then apply env overrides.
    /// A missing file means defaults; a malformed one is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_DETECTOR_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DETECTOR_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            tracing::info!(path = %path.display(), "no detector config file, using defaults");
            Self::default()
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read detector config at {}: {}", path.display(), e)
        })?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut cfg: DetectorConfig = toml::from_str(toml_str)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(ENV_DETECTOR_MODEL_DIR) {
            if !dir.trim().is_empty() {
                self.model.store_dir = PathBuf::from(dir.trim());
            }
        }
        if let Some(n) = parse_usize_env(std::env::var(ENV_DETECTOR_MAX_CHARS).ok()) {
            self.input.max_chars = n;
        }
        if let Some(b) = parse_bool_env(std::env::var(ENV_DETECTOR_USE_IDF).ok()) {
            self.features.use_idf = b;
        }
    }

    fn sanitize(&mut self) {
        // Keywords are matched lower-cased; drop blanks so they never match everything.
        self.rules.keywords = self
            .rules
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if self.features.min_token_freq == 0 {
            self.features.min_token_freq = 1;
        }
    }

    /// Reject knob combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), DetectorError> {
        if !(self.classifier.smoothing.is_finite() && self.classifier.smoothing > 0.0) {
            return Err(DetectorError::Configuration(format!(
                "classifier.smoothing must be > 0, got {}",
                self.classifier.smoothing
            )));
        }
        if self.rules.possibly_fake_min_hits == 0
            || self.rules.possibly_fake_min_hits > self.rules.fake_min_hits
        {
            return Err(DetectorError::Configuration(format!(
                "rules thresholds must satisfy 1 <= possibly_fake_min_hits ({}) <= fake_min_hits ({})",
                self.rules.possibly_fake_min_hits, self.rules.fake_min_hits
            )));
        }
        if self.input.max_chars == 0 {
            return Err(DetectorError::Configuration(
                "input.max_chars must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn parse_usize_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

fn parse_bool_env(raw: Option<String>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
