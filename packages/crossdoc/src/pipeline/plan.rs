//! Pass planning - how many passes a document set needs and how many items
//! each pass should target.
//!
//! The pass count is derived once from the document set and then held fixed
//! for the whole run; only the item targets and focus change per pass.

use crate::types::{
    document::DocumentSet,
    pass::{Depth, ExtractionParams, Granularity, PassKind, PassProfile},
};

/// Every run makes at least this many passes.
pub const MIN_PASSES: u32 = 3;

/// Characters per estimated concept.
const CHARS_PER_CONCEPT: f64 = 100.0;

/// Concepts one pass is expected to cover.
const CONCEPTS_PER_PASS: f64 = 50.0;

/// The fixed focus catalog. Pass `n > 8` reuses the last entry.
pub const PASS_CATALOG: [PassProfile; 8] = [
    PassProfile {
        kind: PassKind::BroadThemes,
        description: "High-level conceptual themes and major architectural patterns",
        granularity: Granularity::Macro,
        depth: Depth::Surface,
    },
    PassProfile {
        kind: PassKind::TechnicalDetails,
        description: "Technical specifications, APIs, implementation details",
        granularity: Granularity::Micro,
        depth: Depth::Medium,
    },
    PassProfile {
        kind: PassKind::EdgeCases,
        description: "Subtle relationships, edge cases, implicit connections",
        granularity: Granularity::Micro,
        depth: Depth::Deep,
    },
    PassProfile {
        kind: PassKind::CrossReferences,
        description: "Inter-document dependencies and evolutionary patterns",
        granularity: Granularity::Macro,
        depth: Depth::Deep,
    },
    PassProfile {
        kind: PassKind::SemanticVariants,
        description: "Semantic equivalences, terminology variations, implied meanings",
        granularity: Granularity::Micro,
        depth: Depth::Deep,
    },
    PassProfile {
        kind: PassKind::ContextualAnalysis,
        description: "Context-dependent meanings and conditional relationships",
        granularity: Granularity::Micro,
        depth: Depth::Exhaustive,
    },
    PassProfile {
        kind: PassKind::MetaPatterns,
        description: "Patterns of patterns, higher-order relationships",
        granularity: Granularity::Meta,
        depth: Depth::Exhaustive,
    },
    PassProfile {
        kind: PassKind::ResidualExtraction,
        description: "Any remaining unextracted relationships",
        granularity: Granularity::All,
        depth: Depth::Exhaustive,
    },
];

/// Focus profile for a 1-indexed pass number.
pub fn pass_focus(pass_number: u32) -> PassProfile {
    let idx = (pass_number.max(1) as usize - 1).min(PASS_CATALOG.len() - 1);
    PASS_CATALOG[idx]
}

/// Plans the passes of one run over a fixed document set.
#[derive(Debug, Clone, PartialEq)]
pub struct PassPlanner {
    file_count: usize,
    total_content_length: usize,
    estimated_concepts: usize,
    passes_needed: u32,
}

impl PassPlanner {
    /// Derive the plan for a document set.
    pub fn new(documents: &DocumentSet) -> Self {
        Self::from_counts(documents.len(), documents.total_chars())
    }

    /// Derive the plan from raw counts. `file_count` is clamped to 1.
    pub fn from_counts(file_count: usize, total_content_length: usize) -> Self {
        let file_count = file_count.max(1);
        let estimated_concepts = (total_content_length as f64 / CHARS_PER_CONCEPT).ceil() as usize;
        let passes_needed = passes_needed(file_count, estimated_concepts);

        Self {
            file_count,
            total_content_length,
            estimated_concepts,
            passes_needed,
        }
    }

    /// Planned number of passes; fixed for the whole run.
    pub fn passes_needed(&self) -> u32 {
        self.passes_needed
    }

    pub fn estimated_concepts(&self) -> usize {
        self.estimated_concepts
    }

    /// Minimum item target for a pass.
    ///
    /// Non-decreasing in `pass_number`.
    pub fn items_per_pass(&self, pass_number: u32) -> usize {
        let multiplier = 1.0 + pass_number as f64 * 0.5;
        (self.estimated_concepts as f64 / self.passes_needed as f64 * multiplier).ceil() as usize
    }

    /// Full parameter set for a 1-indexed pass.
    pub fn params(&self, pass_number: u32) -> ExtractionParams {
        let items_per_pass = self.items_per_pass(pass_number);

        ExtractionParams {
            file_count: self.file_count,
            avg_file_length: self.total_content_length as f64 / self.file_count as f64,
            total_content_length: self.total_content_length,
            estimated_concepts: self.estimated_concepts,
            potential_comparisons: self.file_count * (self.file_count - 1) / 2,
            passes_needed: self.passes_needed,
            items_per_pass,
            min_items_this_pass: items_per_pass,
            max_items_this_pass: items_per_pass * 3,
            pass_focus: pass_focus(pass_number),
        }
    }
}

/// `max(3, ceil(log2(files) * 2), ceil(concepts / 50))`
fn passes_needed(file_count: usize, estimated_concepts: usize) -> u32 {
    let by_files = ((file_count as f64).log2() * 2.0).ceil() as u32;
    let by_concepts = (estimated_concepts as f64 / CONCEPTS_PER_PASS).ceil() as u32;
    MIN_PASSES.max(by_files).max(by_concepts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::Document;
    use proptest::prelude::*;

    fn doc_set(lengths: &[usize]) -> DocumentSet {
        DocumentSet::new(
            lengths
                .iter()
                .enumerate()
                .map(|(i, len)| Document::new(format!("doc{}.md", i), "a".repeat(*len))),
        )
        .unwrap()
    }

    #[test]
    fn test_single_small_document_gets_floor() {
        let planner = PassPlanner::new(&doc_set(&[120]));
        let params = planner.params(1);

        assert_eq!(params.file_count, 1);
        assert_eq!(params.estimated_concepts, 2);
        assert_eq!(params.potential_comparisons, 0);
        assert_eq!(params.passes_needed, 3);
    }

    #[test]
    fn test_file_count_term() {
        // log2(20) * 2 = 8.64 -> 9
        let planner = PassPlanner::from_counts(20, 1000);
        assert_eq!(planner.passes_needed(), 9);
    }

    #[test]
    fn test_concept_term() {
        // 60_000 chars -> 600 concepts -> 12 passes
        let planner = PassPlanner::from_counts(2, 60_000);
        assert_eq!(planner.passes_needed(), 12);
    }

    #[test]
    fn test_items_per_pass_formula() {
        // 3 docs, 3000 chars: 30 concepts; log2(3) * 2 = 3.17 -> 4 passes
        let planner = PassPlanner::new(&doc_set(&[1000, 1000, 1000]));
        let params = planner.params(1);

        assert_eq!(params.passes_needed, 4);
        assert_eq!(params.items_per_pass, 12); // ceil(30 / 4 * 1.5)
        assert_eq!(params.min_items_this_pass, 12);
        assert_eq!(params.max_items_this_pass, 36);
        assert_eq!(params.potential_comparisons, 3);
        assert!((params.avg_file_length - 1000.0).abs() < f64::EPSILON);
        assert_eq!(planner.params(2).items_per_pass, 15);
    }

    #[test]
    fn test_focus_catalog_order_and_clamp() {
        assert_eq!(pass_focus(1).kind, PassKind::BroadThemes);
        assert_eq!(pass_focus(4).kind, PassKind::CrossReferences);
        assert_eq!(pass_focus(8).kind, PassKind::ResidualExtraction);
        assert_eq!(pass_focus(12).kind, PassKind::ResidualExtraction);
        assert_eq!(pass_focus(8).granularity, Granularity::All);
    }

    #[test]
    fn test_passes_needed_is_fixed_across_passes() {
        let planner = PassPlanner::from_counts(5, 40_000);
        let planned = planner.params(1).passes_needed;
        for pass in 2..=planned {
            assert_eq!(planner.params(pass).passes_needed, planned);
        }
    }

    proptest! {
        #[test]
        fn prop_at_least_three_passes(files in 1usize..200, chars in 0usize..2_000_000) {
            let planner = PassPlanner::from_counts(files, chars);
            prop_assert!(planner.passes_needed() >= MIN_PASSES);
        }

        #[test]
        fn prop_items_per_pass_non_decreasing(
            files in 1usize..50,
            chars in 0usize..500_000,
            pass in 1u32..30,
        ) {
            let planner = PassPlanner::from_counts(files, chars);
            prop_assert!(planner.items_per_pass(pass) <= planner.items_per_pass(pass + 1));
        }
    }
}
