//! Text heuristics for reading quality-check responses.
//!
//! The quality stage asks a language model for free-text assessments and
//! reads them back with the literal rules below. They are deliberately
//! shallow: a numeral anywhere in the text becomes the score, a fixed
//! phrase flags bias, and fixed keywords select issue and suggestion lines.
//! Changing any of them changes when a draft gets revised.

use lazy_static::lazy_static;
use regex::Regex;

/// Score used when a response carries no usable numeral.
pub const DEFAULT_SCORE: f64 = 0.5;

/// Phrase that marks a bias-check response as positive.
pub const BIAS_PHRASE: &str = "bias detected";

/// Lines containing any of these become issues.
pub const ISSUE_KEYWORDS: [&str; 4] = ["issue", "problem", "inaccuracy", "inconsistent"];

/// Lines containing any of these become suggestions.
pub const SUGGESTION_KEYWORDS: [&str; 4] = ["suggest", "recommend", "improve", "consider"];

lazy_static! {
    /// First decimal or integer numeral.
    static ref SCORE_PATTERN: Regex = Regex::new(r"(\d+\.?\d*)").unwrap();
}

/// Clamp a score into [0, 1]. NaN maps to the default score.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return DEFAULT_SCORE;
    }
    score.clamp(0.0, 1.0)
}

/// Extract a score from a model response.
///
/// Takes the first numeral anywhere in `text`, clamps it to [0, 1], and
/// falls back to [`DEFAULT_SCORE`] when there is none. A response such as
/// "Score: 5" therefore reads as 1.0, and "no numbers" reads as 0.5.
pub fn extract_score(text: &str) -> f64 {
    SCORE_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(clamp_score)
        .unwrap_or(DEFAULT_SCORE)
}

/// Extract the first numeral following `label` on the same line.
///
/// Matching on the label is case-insensitive. Returns `None` when the
/// label never appears or no numeral follows it.
pub fn extract_labeled_score(text: &str, label: &str) -> Option<f64> {
    let label = label.to_lowercase();
    text.lines().find_map(|line| {
        let lower = line.to_lowercase();
        let start = lower.find(&label)? + label.len();
        let rest = lower.get(start..)?;
        SCORE_PATTERN
            .captures(rest)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(clamp_score)
    })
}

/// Whether a bias-check response reports bias.
pub fn detects_bias(text: &str) -> bool {
    text.to_lowercase().contains(BIAS_PHRASE)
}

/// Lines of `text` mentioning any issue keyword, trimmed, in order.
pub fn extract_issues(text: &str) -> Vec<String> {
    lines_with_keywords(text, &ISSUE_KEYWORDS)
}

/// Lines of `text` mentioning any suggestion keyword, trimmed, in order.
pub fn extract_suggestions(text: &str) -> Vec<String> {
    lines_with_keywords(text, &SUGGESTION_KEYWORDS)
}

fn lines_with_keywords(text: &str, keywords: &[&str]) -> Vec<String> {
    text.split('\n')
        .filter(|line| {
            let lower = line.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
        .map(|line| line.trim().to_string())
        .collect()
}
