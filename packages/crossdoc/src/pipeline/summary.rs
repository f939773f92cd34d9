//! The human-readable summary artifact of a run.

use crate::types::{
    pass::PassResult,
    report::{ExecutionSummary, MergedReport, SummaryPassLine, SummaryReport},
};

/// Build the summary from the merged report and the passes it came from.
pub fn build_summary(
    report: &MergedReport,
    passes: &[PassResult],
    file_count: usize,
) -> SummaryReport {
    let meta = &report.analysis_metadata;
    let total_items = (meta.total_themes_found + meta.total_contradictions_found) as f64;
    let average_items_per_pass = if passes.is_empty() {
        0
    } else {
        (total_items / passes.len() as f64).round() as u64
    };

    SummaryReport {
        execution_summary: ExecutionSummary {
            total_passes_executed: passes.len(),
            total_themes_extracted: meta.total_themes_found,
            total_contradictions_found: meta.total_contradictions_found,
            total_comparisons_made: meta.total_comparisons_made,
            average_items_per_pass,
            files_analyzed: file_count,
        },
        pass_breakdown: passes
            .iter()
            .map(|p| SummaryPassLine {
                pass: p.pass_number,
                pass_type: p.pass_type,
                themes: p.themes.len(),
                contradictions: p.contradictions.len(),
                total: p.items_extracted,
            })
            .collect(),
        top_connected_files: report.extraction_summary.files_with_most_connections.clone(),
    }
}
