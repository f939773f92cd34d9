//! Ordered matcher strategies.
//!
//! Each strategy is a pure function from a prepared document and a phrase to
//! the span it found, if any. The resolver tries them in `STRATEGIES` order
//! and stops at the first admissible match. All comparisons fold ASCII case
//! only, so byte offsets of lowered text equal those of the original.

use crate::anchor::admissibility::is_substantial_word;
use crate::anchor::normalize::NormalizedText;
use crate::types::anchor::Span;

/// Share of substantial words the prefix strategy must keep.
const PREFIX_MIN_RATIO: f64 = 0.8;

/// Fewest words the prefix strategy ever searches for.
const PREFIX_MIN_WORDS: usize = 2;

/// A document prepared once for repeated lookups.
#[derive(Debug, Clone)]
pub struct SearchText<'a> {
    original: &'a str,
    lowered: String,
    markdown: NormalizedText,
    collapsed: NormalizedText,
}

impl<'a> SearchText<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            lowered: original.to_ascii_lowercase(),
            markdown: NormalizedText::markdown(original).to_ascii_lowercase(),
            collapsed: NormalizedText::collapsed(original).to_ascii_lowercase(),
        }
    }

    pub fn original(&self) -> &'a str {
        self.original
    }
}

pub type MatchFn = fn(&SearchText<'_>, &str) -> Option<Span>;

/// A named matcher strategy.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub find: MatchFn,
}

/// Strategies in priority order.
pub const STRATEGIES: [Strategy; 4] = [
    Strategy {
        name: "normalized",
        find: match_normalized,
    },
    Strategy {
        name: "raw",
        find: match_raw,
    },
    Strategy {
        name: "collapsed",
        find: match_collapsed,
    },
    Strategy {
        name: "prefix",
        find: match_prefix,
    },
];

/// Case-insensitive match against the markdown-normalized document.
pub fn match_normalized(search: &SearchText<'_>, phrase: &str) -> Option<Span> {
    let needle = NormalizedText::markdown(phrase.trim()).to_ascii_lowercase();
    find_mapped(&search.markdown, needle.as_str())
}

/// Case-insensitive match against the raw document.
pub fn match_raw(search: &SearchText<'_>, phrase: &str) -> Option<Span> {
    let needle = phrase.trim().to_ascii_lowercase();
    find_raw(search, &needle)
}

/// Case-insensitive match with every whitespace run collapsed on both sides.
pub fn match_collapsed(search: &SearchText<'_>, phrase: &str) -> Option<Span> {
    let needle = NormalizedText::collapsed(phrase.trim()).to_ascii_lowercase();
    find_mapped(&search.collapsed, needle.as_str())
}

/// Longest found prefix of the phrase's substantial words.
///
/// Words are dropped from the end one at a time while at least 80% of them
/// (and never fewer than two) remain.
pub fn match_prefix(search: &SearchText<'_>, phrase: &str) -> Option<Span> {
    let words: Vec<&str> = phrase
        .split_whitespace()
        .filter(|w| is_substantial_word(w))
        .collect();
    if words.len() < PREFIX_MIN_WORDS {
        return None;
    }

    let min_words = PREFIX_MIN_WORDS.max((words.len() as f64 * PREFIX_MIN_RATIO).floor() as usize);

    (min_words..=words.len()).rev().find_map(|len| {
        let needle = words[..len].join(" ").to_ascii_lowercase();
        find_raw(search, &needle)
    })
}

fn find_raw(search: &SearchText<'_>, needle: &str) -> Option<Span> {
    if needle.is_empty() {
        return None;
    }
    let start = search.lowered.find(needle)?;
    Some(Span::new(start, start + needle.len()))
}

fn find_mapped(haystack: &NormalizedText, needle: &str) -> Option<Span> {
    if needle.is_empty() {
        return None;
    }
    let start = haystack.as_str().find(needle)?;
    haystack.original_span(start, start + needle.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_maps_across_line_breaks() {
        let text = "Intro.\n\n   Retry queue\n   for failures here.";
        let search = SearchText::new(text);

        let span = match_normalized(&search, "retry queue\nfor failures").unwrap();
        assert_eq!(span.slice(text), Some("Retry queue\n   for failures"));
    }

    #[test]
    fn test_raw_is_case_insensitive() {
        let text = "The system uses a Retry Queue for failures.";
        let search = SearchText::new(text);

        let span = match_raw(&search, "retry queue for failures").unwrap();
        assert_eq!(span, Span::new(18, 42));
    }

    #[test]
    fn test_collapsed_matches_when_line_breaks_differ() {
        let text = "uses a retry\nqueue  for failures";
        let search = SearchText::new(text);

        assert!(match_normalized(&search, "retry queue for failures").is_none());
        assert!(match_raw(&search, "retry queue for failures").is_none());

        let span = match_collapsed(&search, "retry queue for failures").unwrap();
        assert_eq!(span.slice(text), Some("retry\nqueue  for failures"));
    }

    #[test]
    fn test_prefix_drops_trailing_words() {
        let text = "Workers drain the retry queue after failures settle down.";
        let search = SearchText::new(text);

        // substantial words: retry queue after failures settle hourly
        let span = match_prefix(&search, "retry queue after failures settle hourly").unwrap();
        assert_eq!(span.slice(text), Some("retry queue after failures settle"));
    }

    #[test]
    fn test_prefix_respects_eighty_percent_floor() {
        let text = "retry queue only";
        let search = SearchText::new(text);

        // five words, floor(5 * 0.8) = 4 must remain
        assert!(match_prefix(&search, "retry queue after failures settle").is_none());
    }

    #[test]
    fn test_strategy_order() {
        let names: Vec<&str> = STRATEGIES.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["normalized", "raw", "collapsed", "prefix"]);
    }
}
