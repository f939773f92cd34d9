//! LLM prompts for the multi-pass extraction.
//!
//! Prompt building is a pure function of the document set, the pass number,
//! the results of earlier passes and the pass parameters. Identical inputs
//! always produce identical text.

use crate::types::{
    document::DocumentSet,
    pass::{Depth, ExtractionParams, Granularity, PassKind, PassResult},
};

/// How many earlier theme labels the exclusion list repeats.
pub const PREVIOUS_THEMES_LIMIT: usize = 20;

/// Share of the minimum item target asked for as contradictions.
const CONTRADICTION_TARGET_RATIO: f64 = 0.3;

/// System instruction sent with every pass.
pub const SYSTEM_PROMPT: &str = r#"You are an expert document analyzer performing pass {pass_number} of a multi-pass extraction.
You must extract between {min_items} and {max_items} items in this pass.
Focus on {pass_type}: {pass_description}"#;

/// User prompt for one extraction pass.
pub const PASS_PROMPT: &str = r#"MULTI-PASS EXTRACTION - PASS {pass_number} of {passes_needed}

CURRENT PASS FOCUS: {pass_type_upper}
Description: {pass_description}
Granularity: {granularity}
Analysis Depth: {depth}
{previous_context}
EXTRACTION REQUIREMENTS FOR THIS PASS:
- MINIMUM items to extract: {min_items}
- MAXIMUM items to extract: {max_items}
- Do NOT stop until minimum is reached
- Continue extracting until maximum if content permits

PASS-SPECIFIC INSTRUCTIONS:
{pass_instructions}

EXTRACTION METHODOLOGY FOR PASS {pass_number}:

1. {scan_mode}:
   {methodology}

2. RELATIONSHIP DISCOVERY:
   - {granularity_hint}
   - {depth_hint}
   - Look for {relationship_types}

3. EXTRACTION TARGETS:
   - Target {min_items} minimum theme extractions
   - Target {min_contradictions} minimum contradiction extractions
   - Include context snippets for every extraction
   - Add similarity/conflict scores to quantify relationships
   - Flag areas needing deeper analysis in next pass

4. QUALITY REQUIREMENTS:
   - Every extraction must include context_before and context_after (10-20 words each)
   - Similarity scores (0-1) for theme relationships
   - Conflict types for contradictions
   - Discovery depth: "{depth}"

5. CONTINUATION SIGNALS:
   Set continuation_needed to true if:
   - You identify areas requiring deeper analysis
   - Unexplored concept clusters remain
   - Pattern complexity exceeds current pass scope
   - You've reached maximum items but more exist

DYNAMIC SCALING FORMULA:
- Base extraction: {estimated_concepts} estimated concepts
- Pass multiplier: {multiplier}x for pass {pass_number}
- Target output: {min_items} to {max_items} items
- If content is dense, lean toward maximum
- If relationships are complex, extract more

AREAS FOR DEEPER ANALYSIS:
Identify and list specific areas that need exploration in future passes:
- Unexplored concept clusters
- Complex relationship networks
- Ambiguous connections
- Terminology requiring semantic analysis
- Cross-file dependencies

REMEMBER:
- Pass {pass_number} of {passes_needed}
- Focus: {pass_type}
- Minimum output: {min_items} items
- This is {pass_position} pass
- {pass_closing}

Files to analyze ({file_count} files, {total_content_length} total characters):
{files}"#;

/// Context block listing what earlier passes already found.
pub const PREVIOUS_CONTEXT_PROMPT: &str = r#"
PREVIOUS EXTRACTION CONTEXT:
- Passes completed: {passes_completed}
- Total themes already found: {total_themes}
- Total contradictions already found: {total_contradictions}
- Areas already explored: {explored_areas}

CRITICAL: You must find NEW themes and contradictions not covered in previous passes.
Previous themes to AVOID repeating:
{previous_themes}

Focus on UNEXPLORED areas and DEEPER relationships.
"#;

/// Format the system instruction for a pass.
pub fn build_system_instruction(params: &ExtractionParams, pass_number: u32) -> String {
    SYSTEM_PROMPT
        .replace("{pass_number}", &pass_number.to_string())
        .replace("{min_items}", &params.min_items_this_pass.to_string())
        .replace("{max_items}", &params.max_items_this_pass.to_string())
        .replace("{pass_type}", params.pass_focus.kind.as_str())
        .replace("{pass_description}", params.pass_focus.description)
}

/// Format the user prompt for a pass.
///
/// `prior` holds the results of passes `1..pass_number` in order.
pub fn build_pass_prompt(
    documents: &DocumentSet,
    pass_number: u32,
    prior: &[PassResult],
    params: &ExtractionParams,
) -> String {
    let focus = &params.pass_focus;
    let is_final = pass_number >= params.passes_needed;

    let (pass_position, pass_closing) = if is_final {
        ("the FINAL", "Extract EVERYTHING remaining")
    } else {
        ("an INTERMEDIATE", "Save some depth for later passes")
    };

    let scan_mode = if focus.kind == PassKind::BroadThemes {
        "BROAD SCANNING"
    } else {
        "DEEP DIVING"
    };

    let granularity_hint = if focus.granularity == Granularity::Macro {
        "Focus on high-level patterns"
    } else {
        "Extract fine-grained details"
    };

    let depth_hint = if focus.depth == Depth::Deep {
        "Analyze implicit and hidden connections"
    } else {
        "Identify explicit relationships"
    };

    let min_contradictions =
        (params.min_items_this_pass as f64 * CONTRADICTION_TARGET_RATIO).ceil() as usize;
    let multiplier = 1.0 + pass_number as f64 * 0.5;

    let filled = PASS_PROMPT
        .replace("{pass_instructions}", pass_instructions(focus.kind))
        .replace("{methodology}", methodology(focus.kind))
        .replace("{relationship_types}", relationship_types(focus.granularity))
        .replace("{scan_mode}", scan_mode)
        .replace("{granularity_hint}", granularity_hint)
        .replace("{depth_hint}", depth_hint)
        .replace("{pass_position}", pass_position)
        .replace("{pass_closing}", pass_closing)
        .replace("{pass_number}", &pass_number.to_string())
        .replace("{passes_needed}", &params.passes_needed.to_string())
        .replace("{pass_type_upper}", &focus.kind.as_str().to_uppercase())
        .replace("{pass_type}", focus.kind.as_str())
        .replace("{pass_description}", focus.description)
        .replace("{granularity}", focus.granularity.as_str())
        .replace("{depth}", focus.depth.as_str())
        .replace("{min_items}", &params.min_items_this_pass.to_string())
        .replace("{max_items}", &params.max_items_this_pass.to_string())
        .replace("{min_contradictions}", &min_contradictions.to_string())
        .replace("{estimated_concepts}", &params.estimated_concepts.to_string())
        .replace("{multiplier}", &multiplier.to_string())
        .replace("{file_count}", &documents.len().to_string())
        .replace(
            "{total_content_length}",
            &params.total_content_length.to_string(),
        );

    // Earlier labels and document text come from outside and go in last, in
    // one scan, so placeholders inside them are left alone
    let previous_context = format_previous_context(prior);
    let files = format_documents(documents);
    fill_once(
        &filled,
        &[
            ("{previous_context}", previous_context.as_str()),
            ("{files}", files.as_str()),
        ],
    )
}

/// Replace each placeholder in `template` with its value in a single scan.
/// Inserted values are never scanned again.
fn fill_once(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        let next = values
            .iter()
            .filter_map(|(key, value)| rest.find(key).map(|at| (at, *key, *value)))
            .min_by_key(|(at, _, _)| *at);
        let Some((at, key, value)) = next else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..at]);
        out.push_str(value);
        rest = &rest[at + key.len()..];
    }
}

/// The earlier-passes block, empty on the first pass.
fn format_previous_context(prior: &[PassResult]) -> String {
    if prior.is_empty() {
        return String::new();
    }

    let total_themes: usize = prior.iter().map(|r| r.themes.len()).sum();
    let total_contradictions: usize = prior.iter().map(|r| r.contradictions.len()).sum();
    let explored_areas = prior
        .iter()
        .map(|r| r.pass_type.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let previous_themes = prior
        .iter()
        .flat_map(|r| r.themes.iter())
        .take(PREVIOUS_THEMES_LIMIT)
        .map(|t| format!("- {}", t.label))
        .collect::<Vec<_>>()
        .join("\n");

    PREVIOUS_CONTEXT_PROMPT
        .replace("{passes_completed}", &prior.len().to_string())
        .replace("{total_themes}", &total_themes.to_string())
        .replace("{total_contradictions}", &total_contradictions.to_string())
        .replace("{explored_areas}", &explored_areas)
        .replace("{previous_themes}", &previous_themes)
}

fn format_documents(documents: &DocumentSet) -> String {
    documents
        .iter()
        .map(|doc| {
            format!(
                "========================================\nFile: {}\nLength: {} characters\nContent:\n{}\n========================================\n",
                doc.name,
                doc.char_len(),
                doc.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn pass_instructions(kind: PassKind) -> &'static str {
    match kind {
        PassKind::BroadThemes => {
            "- Identify overarching architectural patterns
- Extract high-level design principles
- Find common methodologies across files
- Look for shared goals and objectives
- Identify technology stacks and frameworks"
        }
        PassKind::TechnicalDetails => {
            "- Extract specific API endpoints and parameters
- Identify data structures and schemas
- Find configuration settings and values
- Extract algorithm implementations
- Identify specific version numbers and dependencies"
        }
        PassKind::EdgeCases => {
            "- Find subtle contradictions in approach
- Identify implicit assumptions
- Extract boundary conditions
- Find mentioned-but-not-explained concepts
- Identify potential conflict points"
        }
        PassKind::CrossReferences => {
            "- Map document-to-document dependencies
- Identify temporal evolution of concepts
- Find references to external systems
- Extract prerequisite relationships
- Identify circular dependencies"
        }
        PassKind::SemanticVariants => {
            "- Find ALL ways the same concept is expressed
- Identify abbreviations and their full forms
- Extract synonymous technical terms
- Find informal vs formal terminology
- Identify context-dependent meanings"
        }
        PassKind::ContextualAnalysis => {
            "- Extract conditional relationships (if X then Y)
- Find context-dependent behaviors
- Identify environmental dependencies
- Extract state-dependent patterns
- Find temporal conditions"
        }
        PassKind::MetaPatterns => {
            "- Identify patterns in how concepts are organized
- Find recurring structural patterns
- Extract meta-level design decisions
- Identify systematic biases or preferences
- Find emergent properties from combinations"
        }
        PassKind::ResidualExtraction => {
            "- Extract EVERYTHING not yet captured
- Find the most obscure relationships
- Identify single-mention concepts
- Extract partial or incomplete ideas
- Capture any remaining value"
        }
    }
}

fn methodology(kind: PassKind) -> &'static str {
    match kind {
        PassKind::BroadThemes => {
            "Scan all files for recurring high-level concepts, architectures, and design patterns"
        }
        PassKind::TechnicalDetails => {
            "Deep-dive into implementation specifics, code patterns, and technical specifications"
        }
        PassKind::EdgeCases => {
            "Analyze boundaries, exceptions, and special cases mentioned in the documents"
        }
        PassKind::CrossReferences => "Map how documents reference and depend on each other",
        PassKind::SemanticVariants => {
            "Identify all variations in terminology and expression of concepts"
        }
        PassKind::ContextualAnalysis => "Analyze how context changes meaning and relationships",
        PassKind::MetaPatterns => "Identify patterns in the patterns themselves",
        PassKind::ResidualExtraction => "Exhaustively extract any remaining unanalyzed content",
    }
}

fn relationship_types(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Macro => {
            "architectural similarities, design pattern matches, strategic alignments"
        }
        Granularity::Micro => {
            "parameter matches, value correspondences, specific implementation details"
        }
        Granularity::Meta => {
            "patterns of patterns, systematic approaches, organizational principles"
        }
        Granularity::All => "all relationship types",
    }
}
