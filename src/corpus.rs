//! Documents and labeled training corpora.
//!
//! On disk a corpus is two JSON Lines record sets, one per label:
//! ```text
//! {"title": "Miracle cure found", "text": "Doctors hate it..."}
//! {"title": "Viral rumor about celebrity"}
//! ```
//! Blank lines are skipped. Records with neither title nor text are skipped with a warning.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

use crate::classifier::Label;
use crate::tokenize;

/// One request's input: headline and/or article body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, alias = "title")]
    pub headline: String,
    #[serde(default, alias = "text")]
    pub article: String,
}

impl Document {
    pub fn new(headline: impl Into<String>, article: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            article: article.into(),
        }
    }

    /// Headline and article joined with a space; empty sides dropped.
    pub fn text(&self) -> String {
        tokenize::combine(&self.headline, &self.article)
    }

    pub fn is_blank(&self) -> bool {
        self.headline.trim().is_empty() && self.article.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledDocument {
    pub text: String,
    pub label: Label,
}

impl LabeledDocument {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// The four-document corpus the app shipped with; enough to exercise the whole pipeline.
pub fn demo_corpus() -> Vec<LabeledDocument> {
    vec![
        LabeledDocument::new("Breaking! Miracle cure found!", Label::Fake),
        LabeledDocument::new("Government releases new policy", Label::Real),
        LabeledDocument::new("Viral rumor about celebrity", Label::Fake),
        LabeledDocument::new("Stock market shows steady growth", Label::Real),
    ]
}

/// Parse one JSON Lines record set, labelling every record with `label`.
pub fn parse_jsonl(raw: &str, label: Label) -> anyhow::Result<Vec<LabeledDocument>> {
    let mut out = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let doc: Document = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid record", lineno + 1))?;
        if doc.is_blank() {
            warn!(line = lineno + 1, %label, "skipping empty corpus record");
            continue;
        }
        out.push(LabeledDocument::new(doc.text(), label));
    }
    Ok(out)
}

pub fn load_jsonl(path: &Path, label: Label) -> anyhow::Result<Vec<LabeledDocument>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {label} corpus at {}", path.display()))?;
    parse_jsonl(&raw, label).with_context(|| format!("in {}", path.display()))
}

/// Fake records first, then real, each in file order.
pub fn load_pair(fake: &Path, real: &Path) -> anyhow::Result<Vec<LabeledDocument>> {
    let mut corpus = load_jsonl(fake, Label::Fake)?;
    corpus.extend(load_jsonl(real, Label::Real)?);
    Ok(corpus)
}
