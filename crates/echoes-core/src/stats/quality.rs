//! Reflection quality heuristic
//!
//! A rough signal of how much thought went into an answer. It is derived,
//! never authoritative: stored scores are recomputed whenever text changes.

/// Words that suggest the writer is reasoning, not just reporting
pub const DEPTH_KEYWORDS: &[&str] = &[
    "because",
    "however",
    "although",
    "therefore",
    "realized",
    "learned",
    "understand",
    "meaning",
    "reflect",
    "perspective",
];

/// Phrases that suggest first-person, emotional engagement
pub const PERSONAL_PHRASES: &[&str] = &[
    "i feel",
    "i felt",
    "i remember",
    "i believe",
    "i think",
    "i wish",
    "i hope",
    "taught me",
];

const BASE_SCORE: f64 = 0.5;
const LENGTH_TIERS: &[u32] = &[50, 100, 200];
const LENGTH_TIER_BONUS: f64 = 0.1;
const KEYWORD_BONUS: f64 = 0.05;
const DEPTH_CAP: f64 = 0.1;
const PERSONAL_CAP: f64 = 0.1;
const MIN_SCORE: f64 = 0.1;
const MAX_SCORE: f64 = 1.0;

/// Whitespace-separated word count
pub fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Score a reflection in [0.1, 1.0].
///
/// Base 0.5, +0.1 per length tier passed (>50, >100, >200 words),
/// +0.05 per depth keyword (max +0.1), +0.05 per personal phrase (max +0.1).
/// Each keyword counts once no matter how often it appears.
pub fn quality_score(text: &str, word_count: u32) -> f64 {
    let lower = text.to_lowercase();

    let length_bonus = LENGTH_TIERS
        .iter()
        .filter(|&&tier| word_count > tier)
        .count() as f64
        * LENGTH_TIER_BONUS;

    let depth_hits = DEPTH_KEYWORDS
        .iter()
        .filter(|k| contains_word(&lower, k))
        .count() as f64;
    let personal_hits = PERSONAL_PHRASES
        .iter()
        .filter(|p| contains_word(&lower, p))
        .count() as f64;

    let score = BASE_SCORE
        + length_bonus
        + (depth_hits * KEYWORD_BONUS).min(DEPTH_CAP)
        + (personal_hits * KEYWORD_BONUS).min(PERSONAL_CAP);

    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Match `needle` on word boundaries so "because" does not hit "becausee"
/// and "i feel" does not hit "hi feel"
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
