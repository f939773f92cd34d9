//! Admissibility filters for search phrases and matched text.
//!
//! A phrase that fails these checks is never searched for, and a match that
//! fails them is treated as not found.

use regex::Regex;
use std::sync::LazyLock;

static RE_LETTER_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]{4,}").unwrap());
static RE_SHORT_LETTER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]{3,}").unwrap());
static RE_MEANINGFUL_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,}$").unwrap());

/// Shortest trimmed phrase worth searching for, in characters.
pub const MIN_PHRASE_CHARS: usize = 10;

/// Fewest letter-only words a phrase or match must contain.
pub const MIN_MEANINGFUL_WORDS: usize = 2;

/// Largest tolerated share of leading and trailing whitespace.
pub const MAX_WHITESPACE_RATIO: f64 = 0.05;

/// Why a phrase or match was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("shorter than 10 characters once trimmed")]
    TooShort,

    #[error("fewer than 2 letter-only words")]
    TooFewWords,

    #[error("no run of four or more letters")]
    NoLetterRun,

    #[error("too much surrounding whitespace")]
    WhitespaceHeavy,
}

/// Check a search phrase before any lookup.
pub fn check_phrase(phrase: &str) -> Result<(), Rejection> {
    if phrase.trim().chars().count() < MIN_PHRASE_CHARS {
        return Err(Rejection::TooShort);
    }
    check_content(phrase)
}

/// Check the text a strategy matched.
pub fn check_match(matched: &str) -> Result<(), Rejection> {
    if matched.trim().is_empty() {
        return Err(Rejection::WhitespaceHeavy);
    }
    check_content(matched)
}

fn check_content(text: &str) -> Result<(), Rejection> {
    if meaningful_word_count(text) < MIN_MEANINGFUL_WORDS {
        return Err(Rejection::TooFewWords);
    }
    if !has_letter_run(text) {
        return Err(Rejection::NoLetterRun);
    }
    if whitespace_ratio(text) > MAX_WHITESPACE_RATIO {
        return Err(Rejection::WhitespaceHeavy);
    }
    Ok(())
}

/// Whitespace-separated tokens made only of two or more ASCII letters.
pub fn meaningful_word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| RE_MEANINGFUL_WORD.is_match(w))
        .count()
}

/// Whether `text` contains four consecutive ASCII letters.
pub fn has_letter_run(text: &str) -> bool {
    RE_LETTER_RUN.is_match(text)
}

/// Words the prefix strategy keeps: longer than three characters with at
/// least three consecutive letters.
pub fn is_substantial_word(word: &str) -> bool {
    word.chars().count() > 3 && RE_SHORT_LETTER_RUN.is_match(word)
}

/// Share of `text` (in characters) that is leading or trailing whitespace.
pub fn whitespace_ratio(text: &str) -> f64 {
    let len = text.chars().count();
    if len == 0 {
        return 1.0;
    }
    let trimmed = text.trim().chars().count();
    (len - trimmed) as f64 / len as f64
}
