//! Keyword-overlap scoring.
//!
//! Each expected phrase contributes up to [`PHRASE_WEIGHT`] points in
//! proportion to how many of its keywords appear (as case-insensitive
//! substrings) in the response. The sum is clamped to [`MAX_SCORE`] and
//! rounded. Nothing here is random or stateful.

use serde::{Deserialize, Serialize};

/// Points a fully matched phrase contributes.
pub const PHRASE_WEIGHT: f64 = 25.0;

/// Ceiling on the total score for one question.
pub const MAX_SCORE: u8 = 100;

/// Score threshold for [`FeedbackTier::Strong`].
pub const STRONG_THRESHOLD: u8 = 70;

/// Score threshold for [`FeedbackTier::Partial`].
pub const PARTIAL_THRESHOLD: u8 = 40;

/// Split a phrase into lowercase keyword tokens.
pub fn keywords(phrase: &str) -> Vec<String> {
    phrase
        .split_whitespace()
        .map(|token| token.to_lowercase())
        .collect()
}

/// Fraction of a phrase's keywords found in an already-lowercased response.
///
/// A phrase with no keywords matches nothing.
fn match_ratio(phrase: &str, response_lower: &str) -> f64 {
    let tokens = keywords(phrase);
    if tokens.is_empty() {
        return 0.0;
    }
    let matched = tokens
        .iter()
        .filter(|token| response_lower.contains(token.as_str()))
        .count();
    matched as f64 / tokens.len() as f64
}

/// Unclamped, unrounded sum of phrase contributions.
pub fn raw_score<S: AsRef<str>>(expected_phrases: &[S], response: &str) -> f64 {
    let response_lower = response.to_lowercase();
    expected_phrases
        .iter()
        .map(|phrase| match_ratio(phrase.as_ref(), &response_lower) * PHRASE_WEIGHT)
        .sum()
}

/// Score a response against a question's expected phrases, in `0..=100`.
pub fn score<S: AsRef<str>>(expected_phrases: &[S], response: &str) -> u8 {
    scored(expected_phrases, response).1
}

/// The raw sum alongside the stored score.
///
/// Feedback is chosen from the raw value, so an answer that rounds up to a
/// threshold does not cross it.
pub fn scored<S: AsRef<str>>(expected_phrases: &[S], response: &str) -> (f64, u8) {
    let raw = raw_score(expected_phrases, response);
    (raw, round_score(raw))
}

fn round_score(raw: f64) -> u8 {
    raw.clamp(0.0, f64::from(MAX_SCORE)).round() as u8
}

/// Per-phrase breakdown of a score, for explaining a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseMatch {
    pub phrase: String,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub points: f64,
}

/// Break a score down phrase by phrase.
pub fn explain<S: AsRef<str>>(expected_phrases: &[S], response: &str) -> Vec<PhraseMatch> {
    let response_lower = response.to_lowercase();
    expected_phrases
        .iter()
        .map(|phrase| {
            let phrase = phrase.as_ref();
            let (matched, missing): (Vec<String>, Vec<String>) = keywords(phrase)
                .into_iter()
                .partition(|token| response_lower.contains(token.as_str()));
            PhraseMatch {
                phrase: phrase.to_string(),
                points: match_ratio(phrase, &response_lower) * PHRASE_WEIGHT,
                matched,
                missing,
            }
        })
        .collect()
}

/// Which kind of feedback a score earns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTier {
    /// `raw >= 70`
    Strong,
    /// `40 <= raw < 70`
    Partial,
    /// `raw < 40`
    Redirect,
}

impl FeedbackTier {
    /// Tier for a stored integer score.
    pub fn for_score(score: u8) -> Self {
        Self::for_raw(f64::from(score))
    }

    /// Tier for an unrounded raw score.
    pub fn for_raw(raw: f64) -> Self {
        if raw >= f64::from(STRONG_THRESHOLD) {
            FeedbackTier::Strong
        } else if raw >= f64::from(PARTIAL_THRESHOLD) {
            FeedbackTier::Partial
        } else {
            FeedbackTier::Redirect
        }
    }

    /// The asker's reply for this tier.
    pub fn message(self) -> &'static str {
        match self {
            FeedbackTier::Strong => {
                "Great answer! You demonstrate a solid understanding of this concept."
            }
            FeedbackTier::Partial => {
                "Good response. You covered some key points, though there are additional aspects to consider."
            }
            FeedbackTier::Redirect => {
                "Thank you for your response. Let me ask about this topic from a different angle."
            }
        }
    }
}
