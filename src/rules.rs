//! Keyword heuristics: the offline fallback that needs no training.
//!
//! The combined headline + article is lower-cased with whitespace runs condensed, then every
//! configured keyword is checked as a plain substring. A keyword counts once no matter how often
//! it occurs. Hit count maps to a verdict:
//! - `>= fake_min_hits`          → `Fake`
//! - `>= possibly_fake_min_hits` → `PossiblyFake`
//! - otherwise                   → `Real`

use serde::{Deserialize, Serialize};

use crate::config::RulesConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Real,
    PossiblyFake,
    Fake,
}

/// Verdict plus the keywords that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleScore {
    pub verdict: Verdict,
    pub hits: Vec<String>,
}

impl RuleScore {
    /// Heuristic score in [0.5, 0.95]; uncalibrated, only ordered by hit count.
    pub fn confidence(&self) -> f64 {
        match self.verdict {
            Verdict::Real => 0.5,
            _ => (0.5 + 0.1 * self.hits.len() as f64).min(0.95),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeywordScorer {
    keywords: Vec<String>,
    fake_min_hits: usize,
    possibly_fake_min_hits: usize,
}

impl KeywordScorer {
    pub fn new(cfg: &RulesConfig) -> Self {
        let mut keywords: Vec<String> = Vec::with_capacity(cfg.keywords.len());
        for k in &cfg.keywords {
            let k = normalize(k);
            if !k.is_empty() && !keywords.contains(&k) {
                keywords.push(k);
            }
        }
        Self {
            keywords,
            fake_min_hits: cfg.fake_min_hits,
            possibly_fake_min_hits: cfg.possibly_fake_min_hits,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn score(&self, text: &str) -> RuleScore {
        let text = normalize(text);
        let hits: Vec<String> = self
            .keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .cloned()
            .collect();

        let verdict = if hits.len() >= self.fake_min_hits {
            Verdict::Fake
        } else if hits.len() >= self.possibly_fake_min_hits {
            Verdict::PossiblyFake
        } else {
            Verdict::Real
        };
        RuleScore { verdict, hits }
    }
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new(&RulesConfig::default())
    }
}

// lowercase + condensed spaces
fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            last_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_keywords_is_fake() {
        let s = KeywordScorer::default().score("The secret of the miracle diet");
        assert_eq!(s.verdict, Verdict::Fake);
        assert_eq!(s.hits, vec!["secret", "miracle"]);
    }

    #[test]
    fn one_keyword_is_possibly_fake() {
        let s = KeywordScorer::default().score("A secret meeting took place");
        assert_eq!(s.verdict, Verdict::PossiblyFake);
        assert_eq!(s.hits.len(), 1);
    }

    #[test]
    fn no_keywords_is_real() {
        let s = KeywordScorer::default().score("Government releases new policy");
        assert_eq!(s.verdict, Verdict::Real);
        assert!(s.hits.is_empty());
        assert_eq!(s.confidence(), 0.5);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let s = KeywordScorer::default().score("secret secret SECRET");
        assert_eq!(s.verdict, Verdict::PossiblyFake);
    }

    #[test]
    fn phrases_match_across_whitespace_and_case() {
        let s = KeywordScorer::default().score("The  HIDDEN\ttruth, EXPOSED");
        assert_eq!(s.hits, vec!["hidden truth", "exposed"]);
        assert_eq!(s.verdict, Verdict::Fake);
    }

    #[test]
    fn keywords_match_as_substrings() {
        // "cure" inside "secure" still counts: plain substring matching.
        let s = KeywordScorer::default().score("A secure vault");
        assert_eq!(s.hits, vec!["cure"]);
    }

    #[test]
    fn custom_thresholds() {
        let cfg = RulesConfig {
            keywords: vec!["alpha".into(), "beta".into(), "gamma".into()],
            fake_min_hits: 3,
            possibly_fake_min_hits: 2,
        };
        let s = KeywordScorer::new(&cfg);
        assert_eq!(s.score("alpha").verdict, Verdict::Real);
        assert_eq!(s.score("alpha beta").verdict, Verdict::PossiblyFake);
        assert_eq!(s.score("alpha beta gamma").verdict, Verdict::Fake);
    }

    #[test]
    fn confidence_grows_with_hits_and_is_capped() {
        let s = KeywordScorer::default();
        let one = s.score("secret").confidence();
        let two = s.score("secret miracle").confidence();
        let many = s
            .score("shocking secret miracle unbelievable banned exposed cure conspiracy")
            .confidence();
        assert!(one < two && two < many);
        assert!(many <= 0.95);
    }
}
