//! Shared tokenizer: the one place text becomes tokens, for training and inference alike.

/// Lower-cased alphanumeric tokens. Anything that is not a letter or digit is a boundary.
///
/// The whole text is lower-cased before splitting: some letters lower-case into a letter plus
/// a combining mark (`İ` -> `i\u{307}`), and the mark is itself a boundary.
pub fn normalize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Iterator form used by the feature extractor.
pub fn tokens(text: &str) -> impl Iterator<Item = String> {
    normalize(text).into_iter()
}

/// Inverse of `normalize` for whitespace-free tokens.
pub fn normalize_to_text(tokens: &[String]) -> String {
    tokens.join(" ")
}

/// Headline and article joined the way every scorer sees them.
pub fn combine(headline: &str, article: &str) -> String {
    let (h, a) = (headline.trim(), article.trim());
    match (h.is_empty(), a.is_empty()) {
        (true, _) => a.to_string(),
        (_, true) => h.to_string(),
        _ => format!("{h} {a}"),
    }
}
