//! Static explanation blocks keyed by label, plus fact-check links templated from the query.
//! No network access: URLs are only built, never fetched.

use serde::Serialize;

use crate::classifier::Label;
use crate::rules::Verdict;

/// A named link shown next to the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub reasoning: String,
    pub advice: String,
    /// Searches for the query on news / fact-check sites, in display order.
    pub sources: Vec<SourceLink>,
}

/// (name, template); `{q}` is replaced with the percent-encoded query.
const SEARCH_TEMPLATES: [(&str, &str); 4] = [
    ("Google News Search", "https://news.google.com/search?q={q}"),
    ("BBC Search", "https://www.bbc.co.uk/search?q={q}"),
    ("Alt News Fact Check", "https://www.altnews.in/?s={q}"),
    ("BOOMLive Fact Check", "https://www.boomlive.in/search?query={q}"),
];

/// General-purpose fact-checking sites, independent of the query.
pub const REFERENCE_SITES: [(&str, &str); 5] = [
    ("Snopes", "https://www.snopes.com/"),
    ("PolitiFact", "https://www.politifact.com/"),
    ("Reuters Fact Check", "https://www.reuters.com/fact-check/"),
    ("AFP Fact Check", "https://factcheck.afp.com/"),
    (
        "Google Fact Check Explorer",
        "https://toolbox.google.com/factcheck/explorer",
    ),
];

const FAKE_REASONING: &str = "This content shows several characteristics commonly seen in fake news:\n\
- The language appears overly dramatic or sensational.\n\
- Claims lack credible or verifiable sources.\n\
- Exaggerated or absolute terms are used.\n\
- The information lacks context or seems manipulated.\n\
These indicators collectively point toward misinformation.";

const REAL_REASONING: &str = "The content appears more balanced and credible:\n\
- Language is factual and not overly emotional.\n\
- Claims appear more grounded with possible context.\n\
- The style avoids unrealistic or exaggerated claims.\n\
Overall, it gives the impression of being authentic.";

const FAKE_ADVICE: &str = "Do not share this content immediately. Verify it through reliable \
fact-checkers like BBC Reality Check, AFP Fact Check, Alt News, or BOOMLive.";

const REAL_ADVICE: &str =
    "Even though it looks real, always verify the source before forwarding it.";

pub fn reasoning(label: Label) -> &'static str {
    match label {
        Label::Fake => FAKE_REASONING,
        Label::Real => REAL_REASONING,
    }
}

pub fn advice(label: Label) -> &'static str {
    match label {
        Label::Fake => FAKE_ADVICE,
        Label::Real => REAL_ADVICE,
    }
}

/// Reasoning for the keyword fallback, which has a three-way verdict.
pub fn rule_reasoning(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Fake => "The text contains multiple suspicious or sensational keywords commonly used in misleading content.",
        Verdict::PossiblyFake => "The text contains at least one sensational keyword, which may indicate misinformation.",
        Verdict::Real => "No major signs of sensational or misleading keywords were detected in the text.",
    }
}

pub fn search_links(query: &str) -> Vec<SourceLink> {
    let encoded = urlencoding::encode(query.trim());
    SEARCH_TEMPLATES
        .iter()
        .map(|(name, tpl)| SourceLink {
            name: (*name).to_string(),
            url: tpl.replace("{q}", &encoded),
        })
        .collect()
}

pub fn reference_sites() -> Vec<SourceLink> {
    REFERENCE_SITES
        .iter()
        .map(|(name, url)| SourceLink {
            name: (*name).to_string(),
            url: (*url).to_string(),
        })
        .collect()
}

pub fn explain(label: Label, query: &str) -> Explanation {
    Explanation {
        reasoning: reasoning(label).to_string(),
        advice: advice(label).to_string(),
        sources: search_links(query),
    }
}
