//! Anchor types - resolved character spans for rendering highlights.

use serde::{Deserialize, Serialize};

use super::finding::FindingKind;

/// A half-open byte range `[start, end)` into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The covered slice, if the span is valid for `text`.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

/// The single best span for one finding in one document.
///
/// `0 <= start < end <= text.len()`, on `char` boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorSpan {
    pub start: usize,
    pub end: usize,

    /// `<kind>-<document>-<start>`
    pub finding_id: String,

    pub finding_type: FindingKind,

    /// Theme label or contradiction description
    pub label: String,

    /// Explanation of the instance the anchor came from
    pub explanation: String,

    /// The counterpart citation in another document, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_doc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_phrase: Option<String>,

    /// Quality score the anchor won with
    pub score: f64,
}

impl AnchorSpan {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// Every anchor resolved in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnchors {
    pub document: String,
    pub anchors: Vec<AnchorSpan>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_slice_respects_bounds() {
        let text = "hello world";
        assert_eq!(Span::new(6, 11).slice(text), Some("world"));
        assert_eq!(Span::new(6, 12).slice(text), None);
        assert!(Span::new(3, 3).is_empty());
    }
}
