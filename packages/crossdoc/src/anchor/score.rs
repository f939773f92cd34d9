//! Match quality scoring.
//!
//! Scores how well a matched substring represents the phrase that was
//! searched for. Zero disqualifies a candidate.

use crate::anchor::admissibility::check_match;

/// Score for a case-insensitive exact match, before bonuses.
const EXACT_SCORE: f64 = 100.0;

/// Weight of edit-distance similarity for inexact matches.
const SIMILARITY_WEIGHT: f64 = 90.0;

const MAX_LENGTH_BONUS: f64 = 10.0;

const SUBSTANTIAL_WORD_BONUS: f64 = 5.0;

/// `(max_len - levenshtein) / max_len` over characters. 1.0 for two empty strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b);
    (max_len - distance) as f64 / max_len as f64
}

/// Quality of `matched` as an anchor for `phrase`.
pub fn match_quality(matched: &str, phrase: &str) -> f64 {
    if check_match(matched).is_err() {
        return 0.0;
    }

    let matched_lower = matched.to_ascii_lowercase();
    let phrase_lower = phrase.to_ascii_lowercase();

    let mut score = if matched_lower == phrase_lower {
        EXACT_SCORE
    } else {
        SIMILARITY_WEIGHT * similarity(&matched_lower, &phrase_lower)
    };

    score += (phrase.chars().count() as f64 / 10.0).min(MAX_LENGTH_BONUS);

    let substantial_words = phrase
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .count();
    score += SUBSTANTIAL_WORD_BONUS * substantial_words as f64;

    let matched_len = matched.chars().count();
    let trimmed_len = matched.trim().chars().count();
    score * trimmed_len as f64 / matched_len as f64
}
