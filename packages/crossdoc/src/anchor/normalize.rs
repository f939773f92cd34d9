//! Whitespace normalization that remembers where every byte came from.
//!
//! Matching runs against a normalized copy of the document, but anchors must
//! point into the original text. Each byte of the normalized text records the
//! original byte range it stands for, so a match maps back exactly.

use crate::types::anchor::Span;

/// A normalized copy of some text plus the map back to the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    text: String,

    /// Original `[start, end)` for every byte of `text`
    origin: Vec<(usize, usize)>,
}

impl NormalizedText {
    /// Markdown-style normalization.
    ///
    /// Whitespace runs spanning a line break become a single `\n` (which also
    /// drops whitespace at line edges), other runs become one space, and the
    /// result is trimmed.
    pub fn markdown(source: &str) -> Self {
        let mut normalized = Self::build(source, true);
        normalized.trim();
        normalized
    }

    /// Collapse every whitespace run to a single space. No trimming.
    pub fn collapsed(source: &str) -> Self {
        Self::build(source, false)
    }

    fn build(source: &str, keep_line_breaks: bool) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut origin = Vec::with_capacity(source.len());
        let mut chars = source.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            let end = start + c.len_utf8();

            if !c.is_whitespace() {
                text.push(c);
                origin.extend(std::iter::repeat((start, end)).take(c.len_utf8()));
                continue;
            }

            let mut run_end = end;
            let mut has_line_break = c == '\n';
            while let Some(&(i, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                has_line_break |= next == '\n';
                run_end = i + next.len_utf8();
                chars.next();
            }

            text.push(if keep_line_breaks && has_line_break {
                '\n'
            } else {
                ' '
            });
            origin.push((start, run_end));
        }

        Self { text, origin }
    }

    /// Drop the (at most one) whitespace byte at each end.
    fn trim(&mut self) {
        if self.text.ends_with([' ', '\n']) {
            self.text.pop();
            self.origin.pop();
        }
        if self.text.starts_with([' ', '\n']) {
            self.text.remove(0);
            self.origin.remove(0);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Original span covered by the normalized byte range `[start, end)`.
    pub fn original_span(&self, start: usize, end: usize) -> Option<Span> {
        if start >= end {
            return None;
        }
        let (original_start, _) = *self.origin.get(start)?;
        let (_, original_end) = *self.origin.get(end - 1)?;
        Some(Span::new(original_start, original_end))
    }

    /// ASCII-lowercased copy. Byte offsets are unchanged.
    pub fn to_ascii_lowercase(&self) -> Self {
        Self {
            text: self.text.to_ascii_lowercase(),
            origin: self.origin.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_keeps_line_breaks() {
        let normalized = NormalizedText::markdown("  Title  \n\n   body   text\t\n");
        assert_eq!(normalized.as_str(), "Title\nbody text");
    }

    #[test]
    fn test_collapsed_flattens_everything() {
        let normalized = NormalizedText::collapsed(" a\n\n b\tc ");
        assert_eq!(normalized.as_str(), " a b c ");
    }

    #[test]
    fn test_maps_back_to_original_coordinates() {
        let source = "retry   queue\n\n  for failures";
        let normalized = NormalizedText::markdown(source);
        assert_eq!(normalized.as_str(), "retry queue\nfor failures");

        let start = normalized.as_str().find("queue").unwrap();
        let end = normalized.as_str().len();
        let span = normalized.original_span(start, end).unwrap();

        assert_eq!(span.slice(source), Some("queue\n\n  for failures"));
    }

    #[test]
    fn test_multibyte_characters_map_to_boundaries() {
        let source = "café\u{00A0}\u{00A0}crème brûlée";
        let normalized = NormalizedText::collapsed(source);
        assert_eq!(normalized.as_str(), "café crème brûlée");

        let start = normalized.as_str().find("crème").unwrap();
        let span = normalized
            .original_span(start, start + "crème".len())
            .unwrap();

        assert!(source.is_char_boundary(span.start));
        assert!(source.is_char_boundary(span.end));
        assert_eq!(span.slice(source), Some("crème"));
    }

    #[test]
    fn test_empty_range_has_no_span() {
        let normalized = NormalizedText::collapsed("abc");
        assert!(normalized.original_span(1, 1).is_none());
        assert!(normalized.original_span(0, 9).is_none());
    }
}
