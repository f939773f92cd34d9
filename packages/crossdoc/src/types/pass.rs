//! Pass types - focus profiles, per-pass parameters, and per-pass results.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::finding::{Contradiction, Theme};

/// The eight focus areas, in the order passes visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    BroadThemes,
    TechnicalDetails,
    EdgeCases,
    CrossReferences,
    SemanticVariants,
    ContextualAnalysis,
    MetaPatterns,
    ResidualExtraction,
}

impl PassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::BroadThemes => "broad_themes",
            PassKind::TechnicalDetails => "technical_details",
            PassKind::EdgeCases => "edge_cases",
            PassKind::CrossReferences => "cross_references",
            PassKind::SemanticVariants => "semantic_variants",
            PassKind::ContextualAnalysis => "contextual_analysis",
            PassKind::MetaPatterns => "meta_patterns",
            PassKind::ResidualExtraction => "residual_extraction",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How coarse the relationships a pass looks for are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Macro,
    Micro,
    Meta,
    All,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Macro => "macro",
            Granularity::Micro => "micro",
            Granularity::Meta => "meta",
            Granularity::All => "all",
        }
    }
}

/// How deep a pass digs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Surface,
    Medium,
    Deep,
    Exhaustive,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Surface => "surface",
            Depth::Medium => "medium",
            Depth::Deep => "deep",
            Depth::Exhaustive => "exhaustive",
        }
    }
}

/// A focus profile from the fixed catalog.
///
/// Only steers prompt content; it has no algorithmic weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassProfile {
    #[serde(rename = "type")]
    pub kind: PassKind,
    pub description: &'static str,
    pub granularity: Granularity,
    pub depth: Depth,
}

/// Parameters derived for one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionParams {
    pub file_count: usize,
    pub avg_file_length: f64,
    pub total_content_length: usize,
    pub estimated_concepts: usize,
    pub potential_comparisons: usize,
    pub passes_needed: u32,
    pub items_per_pass: usize,
    pub min_items_this_pass: usize,
    pub max_items_this_pass: usize,
    pub pass_focus: PassProfile,
}

/// Per-file concept count reported by the extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptCount {
    pub filename: String,
    pub unique_concept_count: u64,
}

/// Everything a pass reported besides its findings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PassMetadata {
    /// Areas the service flagged for a later pass
    #[serde(default)]
    pub areas_for_deeper_analysis: Vec<String>,

    #[serde(default)]
    pub files_analyzed: usize,

    #[serde(default)]
    pub total_comparisons_made: u64,

    /// Free-form completeness label ("failed" for fallback results)
    #[serde(default)]
    pub extraction_completeness: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_percentage: Option<f64>,

    #[serde(default)]
    pub unique_concepts_per_file: Vec<ConceptCount>,

    #[serde(default)]
    pub unexplored_areas: Vec<String>,

    /// Set only on fallback results: why the pass produced nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// The outcome of one pass. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassResult {
    pub pass_number: u32,
    pub pass_type: PassKind,
    pub items_extracted: u64,
    pub continuation_needed: bool,
    #[serde(rename = "common_themes")]
    pub themes: Vec<Theme>,
    pub contradictions: Vec<Contradiction>,
    pub metadata: PassMetadata,
}

impl PassResult {
    /// Whether this result was synthesized after a failed pass.
    pub fn is_fallback(&self) -> bool {
        self.metadata.fallback_reason.is_some()
    }
}
