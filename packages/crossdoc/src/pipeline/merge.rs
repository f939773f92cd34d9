//! Result merging - fold every pass of a run into one report.
//!
//! Deduplication is by identity key only. Within a group of equal keys the
//! entry with the most instances survives and the others are dropped whole;
//! their instances are not folded into the survivor.

use indexmap::IndexMap;
use tracing::info;

use crate::types::{
    finding::{Contradiction, Instance, Keyed, Theme},
    pass::PassResult,
    report::{FileConnection, MergedMetadata, MergedReport, MergedSummary, PassBreakdown},
};

/// Completeness label of every merged report.
pub const MERGED_COMPLETENESS: &str = "exhaustive_multi_pass";

/// How many documents the connection ranking keeps.
pub const TOP_CONNECTED_FILES: usize = 5;

/// Deduplicate by identity key, preserving first-seen order of keys.
///
/// A later entry replaces the kept one only with strictly more instances.
pub fn dedupe<T: Keyed>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut kept: IndexMap<String, T> = IndexMap::new();

    for item in items {
        let key = item.key();
        match kept.get(&key) {
            Some(existing) if existing.instance_count() >= item.instance_count() => {}
            // insert on an existing key keeps the key's original position
            _ => {
                kept.insert(key, item);
            }
        }
    }

    kept.into_values().collect()
}

/// Rank documents by how many instances touch them.
///
/// One connection for the source of every instance, one per target cited.
/// Descending by count, ties in first-encountered order.
pub fn rank_file_connections<'a>(
    instances: impl IntoIterator<Item = &'a Instance>,
    limit: usize,
) -> Vec<FileConnection> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for instance in instances {
        for doc in instance.connected_documents() {
            *counts.entry(doc).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<FileConnection> = counts
        .into_iter()
        .map(|(filename, connection_count)| FileConnection {
            filename: filename.to_string(),
            connection_count,
        })
        .collect();

    // stable: equal counts keep first-encountered order
    ranked.sort_by(|a, b| b.connection_count.cmp(&a.connection_count));
    ranked.truncate(limit);
    ranked
}

/// Merges the ordered pass results of one run.
#[derive(Debug, Clone, Copy)]
pub struct ResultMerger {
    file_count: usize,
}

impl ResultMerger {
    /// `file_count` is the size of the run's document set.
    pub fn new(file_count: usize) -> Self {
        Self {
            file_count: file_count.max(1),
        }
    }

    /// Merge pass results (pass 1 first). Reads the passes, never writes them.
    pub fn merge(&self, passes: &[PassResult]) -> MergedReport {
        let themes: Vec<Theme> = dedupe(passes.iter().flat_map(|p| p.themes.iter().cloned()));
        let contradictions: Vec<Contradiction> =
            dedupe(passes.iter().flat_map(|p| p.contradictions.iter().cloned()));

        let total_comparisons_made = passes
            .iter()
            .map(|p| p.metadata.total_comparisons_made)
            .sum();

        let files_analyzed = passes
            .first()
            .map(|p| p.metadata.files_analyzed)
            .filter(|n| *n > 0)
            .unwrap_or(self.file_count);

        let passes_performed = passes
            .iter()
            .map(|p| PassBreakdown {
                pass_number: p.pass_number,
                pass_type: p.pass_type,
                items_extracted: p.items_extracted,
                themes_found: p.themes.len(),
                contradictions_found: p.contradictions.len(),
            })
            .collect();

        let files_with_most_connections = rank_file_connections(
            themes
                .iter()
                .flat_map(|t| t.instances.iter())
                .chain(contradictions.iter().flat_map(|c| c.instances.iter())),
            TOP_CONNECTED_FILES,
        );

        // Known limitation: later passes never update per-file concept counts
        let unique_concepts_per_file = passes
            .first()
            .map(|p| p.metadata.unique_concepts_per_file.clone())
            .unwrap_or_default();

        info!(
            passes = passes.len(),
            themes = themes.len(),
            contradictions = contradictions.len(),
            "Merged pass results"
        );

        MergedReport {
            analysis_metadata: MergedMetadata {
                files_analyzed,
                total_comparisons_made,
                extraction_completeness: MERGED_COMPLETENESS.to_string(),
                total_themes_found: themes.len(),
                total_contradictions_found: contradictions.len(),
                average_themes_per_file: themes.len() as f64 / self.file_count as f64,
                coverage_percentage: 100.0,
                total_passes: passes.len(),
            },
            themes,
            contradictions,
            extraction_summary: MergedSummary {
                files_with_most_connections,
                unique_concepts_per_file,
                passes_performed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        finding::TargetRef,
        pass::{ConceptCount, PassKind, PassMetadata},
    };
    use proptest::prelude::*;

    fn instance(source: &str, targets: &[&str]) -> Instance {
        targets.iter().fold(
            Instance::new(source, "some quoted phrase", "why"),
            |acc, t| acc.with_target(TargetRef::new(*t, "other quoted phrase")),
        )
    }

    fn theme(label: &str, count: usize) -> Theme {
        Theme::new(label, vec![instance("a.md", &["b.md"]); count])
    }

    fn pass(number: u32, themes: Vec<Theme>, contradictions: Vec<Contradiction>) -> PassResult {
        PassResult {
            pass_number: number,
            pass_type: PassKind::BroadThemes,
            items_extracted: (themes.len() + contradictions.len()) as u64,
            continuation_needed: true,
            themes,
            contradictions,
            metadata: PassMetadata {
                files_analyzed: 3,
                total_comparisons_made: 3,
                unique_concepts_per_file: vec![ConceptCount {
                    filename: format!("pass{}.md", number),
                    unique_concept_count: number as u64,
                }],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_case_insensitive_dedup_keeps_richest() {
        let passes = vec![
            pass(1, vec![theme("Microservices", 2)], vec![]),
            pass(2, vec![theme("microservices", 5)], vec![]),
        ];

        let report = ResultMerger::new(3).merge(&passes);

        assert_eq!(report.themes.len(), 1);
        assert_eq!(report.themes[0].key(), "microservices");
        assert_eq!(report.themes[0].instances.len(), 5);
        assert_eq!(report.analysis_metadata.total_themes_found, 1);
    }

    #[test]
    fn test_tie_keeps_first() {
        let passes = vec![
            pass(1, vec![theme("Retry", 2)], vec![]),
            pass(2, vec![theme("RETRY", 2)], vec![]),
        ];

        let report = ResultMerger::new(3).merge(&passes);
        assert_eq!(report.themes[0].label, "Retry");
    }

    #[test]
    fn test_replacement_keeps_first_seen_position() {
        let passes = vec![
            pass(1, vec![theme("Alpha", 1), theme("Beta", 1)], vec![]),
            pass(2, vec![theme("alpha", 3)], vec![]),
        ];

        let report = ResultMerger::new(3).merge(&passes);
        let labels: Vec<&str> = report.themes.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["alpha", "Beta"]);
    }

    #[test]
    fn test_metadata_totals_after_dedup() {
        let contradiction = Contradiction::new("Retry limits differ", vec![instance("b.md", &["c.md"])]);
        let passes = vec![
            pass(1, vec![theme("Retry", 1), theme("Queue", 1)], vec![contradiction.clone()]),
            pass(2, vec![theme("retry", 1)], vec![contradiction]),
        ];

        let report = ResultMerger::new(4).merge(&passes);
        let meta = &report.analysis_metadata;

        assert_eq!(meta.total_themes_found, 2);
        assert_eq!(meta.total_contradictions_found, 1);
        assert_eq!(meta.total_comparisons_made, 6);
        assert!((meta.average_themes_per_file - 0.5).abs() < f64::EPSILON);
        assert_eq!(meta.total_passes, 2);
        assert_eq!(meta.extraction_completeness, MERGED_COMPLETENESS);
        assert!((meta.coverage_percentage - 100.0).abs() < f64::EPSILON);

        let breakdown = &report.extraction_summary.passes_performed;
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].themes_found, 2);
        assert_eq!(breakdown[1].contradictions_found, 1);
    }

    #[test]
    fn test_unique_concepts_come_from_first_pass_only() {
        let passes = vec![pass(1, vec![], vec![]), pass(2, vec![], vec![])];
        let report = ResultMerger::new(3).merge(&passes);

        let concepts = &report.extraction_summary.unique_concepts_per_file;
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].filename, "pass1.md");
    }

    #[test]
    fn test_file_connection_ranking() {
        let instances = vec![
            instance("a.md", &["b.md"]),
            instance("c.md", &["b.md", "d.md"]),
            instance("e.md", &[]),
            instance("f.md", &["g.md"]),
        ];

        let ranked = rank_file_connections(instances.iter(), TOP_CONNECTED_FILES);
        let names: Vec<&str> = ranked.iter().map(|f| f.filename.as_str()).collect();

        // b.md has 2; the rest tie at 1 in first-encountered order
        assert_eq!(names, vec!["b.md", "a.md", "c.md", "d.md", "e.md"]);
        assert_eq!(ranked[0].connection_count, 2);
    }

    #[test]
    fn test_merge_does_not_mutate_passes() {
        let passes = vec![
            pass(1, vec![theme("Retry", 1)], vec![]),
            pass(2, vec![theme("retry", 4)], vec![]),
        ];
        let before = passes.clone();

        let _ = ResultMerger::new(3).merge(&passes);
        assert_eq!(passes, before);
    }

    fn label_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["Retry", "retry", "RETRY", "Queue", "queue", "Backoff"])
            .prop_map(str::to_string)
    }

    proptest! {
        #[test]
        fn prop_merge_is_idempotent(
            entries in prop::collection::vec((label_strategy(), 0usize..6), 0..20)
        ) {
            let themes: Vec<Theme> = entries.iter().map(|(l, n)| theme(l, *n)).collect();
            let once = ResultMerger::new(3).merge(&[pass(1, themes, vec![])]);
            let twice = ResultMerger::new(3).merge(&[pass(1, once.themes.clone(), vec![])]);

            prop_assert_eq!(once.themes, twice.themes);
        }

        #[test]
        fn prop_dedup_keeps_maximum_instances(
            entries in prop::collection::vec((label_strategy(), 0usize..6), 1..20)
        ) {
            let themes: Vec<Theme> = entries.iter().map(|(l, n)| theme(l, *n)).collect();
            let merged = dedupe(themes.clone());

            for kept in &merged {
                let max = themes
                    .iter()
                    .filter(|t| t.key() == kept.key())
                    .map(|t| t.instances.len())
                    .max()
                    .unwrap_or(0);
                prop_assert_eq!(kept.instances.len(), max);
            }
        }
    }
}
