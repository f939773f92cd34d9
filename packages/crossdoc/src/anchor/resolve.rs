//! Anchor resolution: the single best span per finding per document.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::anchor::admissibility::{check_match, check_phrase};
use crate::anchor::matchers::{SearchText, STRATEGIES};
use crate::anchor::score::match_quality;
use crate::types::anchor::{AnchorSpan, DocumentAnchors, Span};
use crate::types::document::Document;
use crate::types::finding::FindingRef;
use crate::types::report::MergedReport;

/// Locate `phrase` in the prepared document.
///
/// Rejected phrases are never searched for. A strategy whose match fails
/// admissibility counts as not found and the next strategy is tried. The
/// returned span is trimmed to non-whitespace edges.
pub fn locate(search: &SearchText<'_>, phrase: &str) -> Option<Span> {
    if let Err(rejection) = check_phrase(phrase) {
        debug!(phrase, %rejection, "phrase rejected before lookup");
        return None;
    }

    let text = search.original();
    for strategy in STRATEGIES.iter() {
        let Some(span) = (strategy.find)(search, phrase) else {
            continue;
        };
        let Some(matched) = span.slice(text) else {
            continue;
        };
        if let Err(rejection) = check_match(matched) {
            debug!(
                strategy = strategy.name,
                %rejection,
                "match discarded"
            );
            continue;
        }
        debug!(strategy = strategy.name, start = span.start, end = span.end, "phrase located");
        return trim_span(text, span);
    }

    None
}

/// Shrink `span` to its first and last non-whitespace characters.
pub fn trim_span(text: &str, span: Span) -> Option<Span> {
    let slice = span.slice(text)?;
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = span.start + leading;
    Some(Span::new(start, start + trimmed.len()))
}

/// A phrase to look up plus the citation it points at.
struct Candidate<'a> {
    phrase: &'a str,
    explanation: &'a str,
    counterpart: Option<(&'a str, &'a str)>,
}

/// Phrases a finding cites in `document`, in instance order with each
/// source before its targets.
fn candidates<'a>(document: &str, finding: FindingRef<'a>) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    for instance in finding.instances {
        if instance.source_doc == document {
            out.push(Candidate {
                phrase: &instance.source_phrase,
                explanation: &instance.explanation,
                counterpart: instance
                    .target_refs
                    .first()
                    .map(|t| (t.target_doc.as_str(), t.target_phrase.as_str())),
            });
        }
        for target in &instance.target_refs {
            if target.target_doc == document {
                out.push(Candidate {
                    phrase: &target.target_phrase,
                    explanation: &instance.explanation,
                    counterpart: Some((&instance.source_doc, &instance.source_phrase)),
                });
            }
        }
    }
    out
}

fn best_anchor(search: &SearchText<'_>, document: &str, finding: FindingRef<'_>) -> Option<AnchorSpan> {
    let text = search.original();
    let mut best: Option<(Span, f64, Candidate<'_>)> = None;

    for candidate in candidates(document, finding) {
        let Some(span) = locate(search, candidate.phrase) else {
            continue;
        };
        let Some(matched) = span.slice(text) else {
            continue;
        };
        let score = match_quality(matched, candidate.phrase);
        if score <= 0.0 {
            continue;
        }
        if best.as_ref().map_or(true, |(_, top, _)| score > *top) {
            best = Some((span, score, candidate));
        }
    }

    let (span, score, candidate) = best?;
    debug!(
        document,
        finding = finding.label,
        start = span.start,
        end = span.end,
        score,
        "anchor selected"
    );

    Some(AnchorSpan {
        start: span.start,
        end: span.end,
        finding_id: format!("{}-{}-{}", finding.kind, document, span.start),
        finding_type: finding.kind,
        label: finding.label.to_string(),
        explanation: candidate.explanation.to_string(),
        target_doc: candidate.counterpart.map(|(doc, _)| doc.to_string()),
        target_phrase: candidate.counterpart.map(|(_, phrase)| phrase.to_string()),
        score,
    })
}

/// The best anchor for `finding` in `document`, or `None` when no cited
/// phrase can be placed.
pub fn resolve_anchor(document: &Document, finding: FindingRef<'_>) -> Option<AnchorSpan> {
    let search = SearchText::new(&document.text);
    best_anchor(&search, &document.name, finding)
}

/// Anchors for every finding of `report` in `document`, themes first.
pub fn resolve_document(document: &Document, report: &MergedReport) -> Vec<AnchorSpan> {
    let search = SearchText::new(&document.text);
    report
        .findings()
        .filter_map(|finding| best_anchor(&search, &document.name, finding))
        .collect()
}

/// Resolve many documents concurrently, one blocking task per document.
///
/// Output order follows `documents`. A document whose task fails is logged
/// and left out.
pub async fn resolve_all(
    documents: &[Arc<Document>],
    report: Arc<MergedReport>,
) -> Vec<DocumentAnchors> {
    let tasks = documents.iter().map(|document| {
        let document = Arc::clone(document);
        let report = Arc::clone(&report);
        async move {
            let name = document.name.clone();
            let handle = tokio::task::spawn_blocking(move || DocumentAnchors {
                document: document.name.clone(),
                anchors: resolve_document(&document, &report),
            });
            match handle.await {
                Ok(anchors) => Some(anchors),
                Err(e) => {
                    warn!(document = %name, error = %e, "anchor resolution task failed, skipping");
                    None
                }
            }
        }
    });

    join_all(tasks).await.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::finding::{Contradiction, FindingKind, Instance, TargetRef, Theme};
    use crate::types::report::{MergedMetadata, MergedSummary};
    use proptest::prelude::*;

    fn theme(instances: Vec<Instance>) -> Theme {
        Theme::new("Retry handling", instances)
    }

    fn report(themes: Vec<Theme>, contradictions: Vec<Contradiction>) -> MergedReport {
        MergedReport {
            analysis_metadata: MergedMetadata::default(),
            themes,
            contradictions,
            extraction_summary: MergedSummary::default(),
        }
    }

    #[test]
    fn test_exact_match_at_offset() {
        let doc = Document::new("a.md", "The system uses a retry queue for failures.");
        let t = theme(vec![Instance::new("a.md", "retry queue for failures", "both retry")]);

        let anchor = resolve_anchor(&doc, t.as_finding()).unwrap();

        assert_eq!(anchor.start, 18);
        assert_eq!(anchor.end, 42);
        assert!((anchor.score - 117.4).abs() < 1e-9);
        assert_eq!(anchor.finding_id, "theme-a.md-18");
        assert_eq!(anchor.finding_type, FindingKind::Theme);
        assert_eq!(anchor.label, "Retry handling");
        assert_eq!(anchor.target_doc, None);
    }

    #[test]
    fn test_whitespace_phrase_is_not_searched() {
        let doc = Document::new("a.md", "   spaces   everywhere   ");
        let search = SearchText::new(&doc.text);
        assert!(locate(&search, "   ").is_none());

        let t = theme(vec![Instance::new("a.md", "   ", "blank")]);
        assert!(resolve_anchor(&doc, t.as_finding()).is_none());
    }

    #[test]
    fn test_target_match_points_back_at_source() {
        let doc = Document::new("b.md", "Failed jobs go to the dead letter queue.");
        let t = theme(vec![Instance::new("a.md", "retry queue for failures", "both retry")
            .with_target(TargetRef::new("b.md", "the dead letter queue"))]);

        let anchor = resolve_anchor(&doc, t.as_finding()).unwrap();

        assert_eq!(anchor.span().slice(&doc.text), Some("the dead letter queue"));
        assert_eq!(anchor.target_doc.as_deref(), Some("a.md"));
        assert_eq!(anchor.target_phrase.as_deref(), Some("retry queue for failures"));
    }

    #[test]
    fn test_source_match_carries_first_target() {
        let doc = Document::new("a.md", "The system uses a retry queue for failures.");
        let t = theme(vec![Instance::new("a.md", "retry queue for failures", "both retry")
            .with_target(TargetRef::new("b.md", "the dead letter queue"))
            .with_target(TargetRef::new("c.md", "backoff on errors"))]);

        let anchor = resolve_anchor(&doc, t.as_finding()).unwrap();
        assert_eq!(anchor.target_doc.as_deref(), Some("b.md"));
    }

    #[test]
    fn test_highest_score_wins_and_ties_keep_first() {
        let doc = Document::new(
            "a.md",
            "Jobs enter a retry queue. Later a retry queue for failures drains.",
        );
        let t = theme(vec![
            Instance::new("a.md", "enter a retry queue", "short"),
            Instance::new("a.md", "retry queue for failures drains", "longer"),
            Instance::new("a.md", "retry queue for failures drains", "duplicate"),
        ]);

        let anchor = resolve_anchor(&doc, t.as_finding()).unwrap();
        assert_eq!(anchor.explanation, "longer");
        assert_eq!(
            anchor.span().slice(&doc.text),
            Some("retry queue for failures drains")
        );
    }

    #[test]
    fn test_unrelated_document_has_no_anchor() {
        let doc = Document::new("c.md", "retry queue for failures");
        let t = theme(vec![Instance::new("a.md", "retry queue for failures", "why")]);
        assert!(resolve_anchor(&doc, t.as_finding()).is_none());
    }

    #[test]
    fn test_document_anchors_themes_then_contradictions() {
        let doc = Document::new(
            "a.md",
            "Retries happen three times. The system uses a retry queue for failures.",
        );
        let r = report(
            vec![theme(vec![Instance::new("a.md", "retry queue for failures", "t")])],
            vec![Contradiction::new(
                "Retry limits differ",
                vec![Instance::new("a.md", "Retries happen three times", "c")],
            )],
        );

        let anchors = resolve_document(&doc, &r);
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].finding_type, FindingKind::Theme);
        assert_eq!(anchors[1].finding_type, FindingKind::Contradiction);
        assert_eq!(anchors[1].finding_id, "contradiction-a.md-0");
    }

    #[test]
    fn test_trim_span() {
        let text = "  retry queue  ";
        assert_eq!(trim_span(text, Span::new(0, 15)), Some(Span::new(2, 13)));
        assert_eq!(trim_span(text, Span::new(0, 2)), None);
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_document_order() {
        let docs = vec![
            Arc::new(Document::new("a.md", "The system uses a retry queue for failures.")),
            Arc::new(Document::new("b.md", "Failed jobs go to the dead letter queue.")),
        ];
        let r = Arc::new(report(
            vec![theme(vec![Instance::new("a.md", "retry queue for failures", "why")
                .with_target(TargetRef::new("b.md", "the dead letter queue"))])],
            vec![],
        ));

        let resolved = resolve_all(&docs, r).await;

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].document, "a.md");
        assert_eq!(resolved[1].document, "b.md");
        assert_eq!(resolved[1].anchors.len(), 1);
    }

    const WORDS: &[&str] = &[
        "retry", "queue", "for", "failures", "the", "dead", "letter", "workers", "a", "backoff",
        "jobs", "  ", "\n", "drain", "errors",
    ];

    proptest! {
        #[test]
        fn prop_spans_are_valid_and_deterministic(
            picks in proptest::collection::vec(0..WORDS.len(), 4..40),
            from in 0usize..40,
            take in 1usize..8,
        ) {
            let words: Vec<&str> = picks.iter().map(|&i| WORDS[i]).collect();
            let text = words.join(" ");
            let from = from % words.len();
            let phrase = words[from..(from + take).min(words.len())].join(" ");

            let doc = Document::new("a.md", text.clone());
            let t = theme(vec![Instance::new("a.md", phrase, "why")]);

            let first = resolve_anchor(&doc, t.as_finding());
            let second = resolve_anchor(&doc, t.as_finding());
            prop_assert_eq!(&first, &second);

            if let Some(anchor) = first {
                prop_assert!(anchor.start < anchor.end);
                let matched = anchor.span().slice(&text);
                prop_assert!(matched.is_some());
                prop_assert!(check_match(matched.unwrap_or_default()).is_ok());
            }
        }
    }
}
