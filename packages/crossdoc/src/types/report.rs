//! Report types - the merged multi-pass report and its summary artifact.

use serde::{Deserialize, Serialize};

use super::finding::{Contradiction, FindingRef, Theme};
use super::pass::{ConceptCount, PassKind};

/// Aggregate counts for the merged report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MergedMetadata {
    pub files_analyzed: usize,
    pub total_comparisons_made: u64,
    pub extraction_completeness: String,
    pub total_themes_found: usize,
    pub total_contradictions_found: usize,
    pub average_themes_per_file: f64,
    pub coverage_percentage: f64,
    pub total_passes: usize,
}

/// A document and how many instances touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConnection {
    pub filename: String,
    pub connection_count: usize,
}

/// One line of the per-pass breakdown log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassBreakdown {
    pub pass_number: u32,
    pub pass_type: PassKind,
    pub items_extracted: u64,
    pub themes_found: usize,
    pub contradictions_found: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MergedSummary {
    /// Top five documents by connection count
    pub files_with_most_connections: Vec<FileConnection>,

    /// Copied from the first pass only; later passes are not re-aggregated
    pub unique_concepts_per_file: Vec<ConceptCount>,

    pub passes_performed: Vec<PassBreakdown>,
}

/// The de-duplicated report over every pass of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedReport {
    pub analysis_metadata: MergedMetadata,

    #[serde(rename = "common_themes")]
    pub themes: Vec<Theme>,

    pub contradictions: Vec<Contradiction>,

    pub extraction_summary: MergedSummary,
}

impl MergedReport {
    /// Every finding, themes first, as kind-erased views.
    pub fn findings(&self) -> impl Iterator<Item = FindingRef<'_>> {
        self.themes
            .iter()
            .map(Theme::as_finding)
            .chain(self.contradictions.iter().map(Contradiction::as_finding))
    }

    /// Names of every document cited anywhere in the report, first-seen order.
    pub fn referenced_documents(&self) -> Vec<String> {
        let mut seen = indexmap::IndexSet::new();
        for finding in self.findings() {
            for instance in finding.instances {
                for doc in instance.connected_documents() {
                    seen.insert(doc.to_string());
                }
            }
        }
        seen.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_passes_executed: usize,
    pub total_themes_extracted: usize,
    pub total_contradictions_found: usize,
    pub total_comparisons_made: u64,
    pub average_items_per_pass: u64,
    pub files_analyzed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPassLine {
    pub pass: u32,
    #[serde(rename = "type")]
    pub pass_type: PassKind,
    pub themes: usize,
    pub contradictions: usize,
    pub total: u64,
}

/// The human-readable summary artifact written next to the merged report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub execution_summary: ExecutionSummary,
    pub pass_breakdown: Vec<SummaryPassLine>,
    pub top_connected_files: Vec<FileConnection>,
}
