// src/config/mod.rs
pub mod detector;

pub use detector::{
    ClassifierConfig, DetectorConfig, FeaturesConfig, InputConfig, ModelConfig, Overflow,
    RulesConfig,
};
