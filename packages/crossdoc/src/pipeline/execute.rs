//! Pass execution - request one pass from the extraction service and turn
//! the answer into a `PassResult`.
//!
//! A pass ends in exactly one of two states. `Validated` when the response
//! parses into the typed response model, `Fallback` otherwise. A fallback is
//! an empty but well-formed `PassResult` carrying the failure reason, so the
//! caller always gets something it can merge.

use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ai::schema::strict_schema;
use crate::error::{CrossdocError, Result};
use crate::pipeline::prompts::{build_pass_prompt, build_system_instruction};
use crate::traits::ai::{ExtractionService, ServiceRequest};
use crate::types::{
    config::PipelineConfig,
    document::DocumentSet,
    finding::{Contradiction, Instance, Severity, TargetRef, Theme},
    pass::{ConceptCount, ExtractionParams, PassMetadata, PassResult},
};

/// Top-level fields a response must carry to validate.
pub const REQUIRED_FIELDS: [&str; 3] = ["pass_metadata", "common_themes", "contradictions"];

/// Pass response from the extraction service (before transformation).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AIPassResponse {
    pub pass_metadata: AIPassMetadata,

    pub analysis_metadata: Option<AIAnalysisMetadata>,

    pub common_themes: Vec<AITheme>,

    pub contradictions: Vec<AIContradiction>,

    pub extraction_summary: Option<AIExtractionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AIPassMetadata {
    pub pass_number: u32,
    pub pass_type: String,
    pub items_extracted: u64,
    pub continuation_needed: bool,
    #[serde(default)]
    pub areas_for_deeper_analysis: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AIAnalysisMetadata {
    pub files_analyzed: usize,
    pub total_comparisons_made: u64,
    pub extraction_completeness: String,
    #[serde(default)]
    pub total_themes_found: u64,
    #[serde(default)]
    pub total_contradictions_found: u64,
    pub average_themes_per_file: Option<f64>,
    pub coverage_percentage: Option<f64>,
}

/// A theme from the response. `instances` may be missing on a malformed entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AITheme {
    pub theme: String,
    pub frequency_score: Option<f64>,
    pub discovery_depth: Option<String>,
    pub instances: Option<Vec<AIInstance>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AIContradiction {
    pub description: String,
    /// "high", "medium" or "low"
    pub severity: Option<String>,
    pub instances: Option<Vec<AIInstance>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AIInstance {
    pub source_file: String,
    pub source_phrase: String,
    pub target_files: Vec<AITarget>,
    pub explanation: String,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AITarget {
    pub target_file: String,
    pub target_phrase: String,
    pub similarity_score: Option<f64>,
    pub conflict_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AIExtractionSummary {
    #[serde(default)]
    pub files_with_most_connections: Vec<AIFileConnection>,
    #[serde(default)]
    pub unique_concepts_per_file: Vec<AIConceptCount>,
    #[serde(default)]
    pub unexplored_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AIFileConnection {
    pub filename: String,
    pub connection_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AIConceptCount {
    pub filename: String,
    pub unique_concept_count: u64,
}

/// Strict structured-output schema sent with every pass.
pub fn response_schema() -> Value {
    strict_schema::<AIPassResponse>()
}

/// Why a pass fell back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FallbackReason {
    /// Transport or process failure talking to the service
    #[error("service unavailable: {0}")]
    Service(String),

    /// Response was not JSON of the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Response lacked a required top-level field
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Terminal state of one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    Validated(PassResult),
    Fallback {
        result: PassResult,
        reason: FallbackReason,
    },
}

impl PassOutcome {
    pub fn result(&self) -> &PassResult {
        match self {
            PassOutcome::Validated(result) => result,
            PassOutcome::Fallback { result, .. } => result,
        }
    }

    pub fn into_result(self) -> PassResult {
        match self {
            PassOutcome::Validated(result) => result,
            PassOutcome::Fallback { result, .. } => result,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PassOutcome::Fallback { .. })
    }
}

/// Strip a markdown code fence some models wrap JSON in.
fn strip_code_fence(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parse a raw response body into the typed response model.
pub fn parse_pass_response(raw: &str) -> std::result::Result<AIPassResponse, FallbackReason> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| FallbackReason::Malformed(e.to_string()))?;

    let Value::Object(map) = &value else {
        return Err(FallbackReason::Malformed(
            "response is not a JSON object".to_string(),
        ));
    };

    for field in REQUIRED_FIELDS {
        if map.get(field).map_or(true, Value::is_null) {
            return Err(FallbackReason::MissingField(field));
        }
    }

    let wire: WirePassResponse =
        serde_json::from_value(value).map_err(|e| FallbackReason::Malformed(e.to_string()))?;

    Ok(AIPassResponse {
        pass_metadata: wire.pass_metadata,
        analysis_metadata: wire.analysis_metadata,
        common_themes: parse_findings(wire.common_themes, "theme"),
        contradictions: parse_findings(wire.contradictions, "contradiction"),
        extraction_summary: wire.extraction_summary,
    })
}

/// Response envelope with findings left unparsed, so one bad finding does
/// not take the rest of the pass down with it.
#[derive(Deserialize)]
struct WirePassResponse {
    pass_metadata: AIPassMetadata,
    analysis_metadata: Option<AIAnalysisMetadata>,
    common_themes: Vec<Value>,
    contradictions: Vec<Value>,
    extraction_summary: Option<AIExtractionSummary>,
}

/// Parse findings one by one, skipping the malformed ones.
fn parse_findings<T: DeserializeOwned>(raw: Vec<Value>, kind: &str) -> Vec<T> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(finding) => Some(finding),
            Err(e) => {
                warn!(kind, index, error = %e, "Skipping malformed finding");
                None
            }
        })
        .collect()
}

/// Transform a validated response into a `PassResult`.
///
/// Pass number and type come from the plan, not from the response. Findings
/// without an instance list are skipped.
pub fn transform_pass_response(
    response: AIPassResponse,
    pass_number: u32,
    params: &ExtractionParams,
) -> PassResult {
    let themes = response
        .common_themes
        .into_iter()
        .filter_map(|t| {
            let Some(instances) = t.instances else {
                warn!(pass_number, theme = %t.theme, "Skipping theme without instances");
                return None;
            };
            Some(Theme {
                label: t.theme,
                frequency_score: t.frequency_score,
                discovery_depth: t.discovery_depth,
                instances: instances.into_iter().map(transform_instance).collect(),
            })
        })
        .collect();

    let contradictions = response
        .contradictions
        .into_iter()
        .filter_map(|c| {
            let Some(instances) = c.instances else {
                warn!(
                    pass_number,
                    contradiction = %c.description,
                    "Skipping contradiction without instances"
                );
                return None;
            };
            Some(Contradiction {
                description: c.description,
                severity: c.severity.as_deref().and_then(parse_severity),
                instances: instances.into_iter().map(transform_instance).collect(),
            })
        })
        .collect();

    let analysis = response.analysis_metadata;
    let summary = response.extraction_summary.unwrap_or(AIExtractionSummary {
        files_with_most_connections: Vec::new(),
        unique_concepts_per_file: Vec::new(),
        unexplored_areas: Vec::new(),
    });

    let metadata = PassMetadata {
        areas_for_deeper_analysis: response.pass_metadata.areas_for_deeper_analysis,
        files_analyzed: analysis
            .as_ref()
            .map_or(params.file_count, |a| a.files_analyzed),
        total_comparisons_made: analysis.as_ref().map_or(0, |a| a.total_comparisons_made),
        extraction_completeness: analysis
            .as_ref()
            .map(|a| a.extraction_completeness.clone())
            .unwrap_or_default(),
        coverage_percentage: analysis.as_ref().and_then(|a| a.coverage_percentage),
        unique_concepts_per_file: summary
            .unique_concepts_per_file
            .into_iter()
            .map(|c| ConceptCount {
                filename: c.filename,
                unique_concept_count: c.unique_concept_count,
            })
            .collect(),
        unexplored_areas: summary.unexplored_areas,
        fallback_reason: None,
    };

    PassResult {
        pass_number,
        pass_type: params.pass_focus.kind,
        items_extracted: response.pass_metadata.items_extracted,
        continuation_needed: response.pass_metadata.continuation_needed,
        themes,
        contradictions,
        metadata,
    }
}

fn transform_instance(instance: AIInstance) -> Instance {
    Instance {
        source_doc: instance.source_file,
        source_phrase: instance.source_phrase,
        target_refs: instance
            .target_files
            .into_iter()
            .map(|t| TargetRef {
                target_doc: t.target_file,
                target_phrase: t.target_phrase,
                similarity_score: t.similarity_score,
                conflict_type: t.conflict_type,
            })
            .collect(),
        explanation: instance.explanation,
        context_before: instance.context_before,
        context_after: instance.context_after,
    }
}

fn parse_severity(raw: &str) -> Option<Severity> {
    match raw.to_ascii_lowercase().as_str() {
        "high" => Some(Severity::High),
        "medium" => Some(Severity::Medium),
        "low" => Some(Severity::Low),
        _ => None,
    }
}

/// The empty result recorded for a failed pass.
pub fn fallback_result(
    pass_number: u32,
    params: &ExtractionParams,
    reason: &FallbackReason,
) -> PassResult {
    PassResult {
        pass_number,
        pass_type: params.pass_focus.kind,
        items_extracted: 0,
        continuation_needed: false,
        themes: Vec::new(),
        contradictions: Vec::new(),
        metadata: PassMetadata {
            files_analyzed: params.file_count,
            extraction_completeness: "failed".to_string(),
            coverage_percentage: Some(0.0),
            unexplored_areas: vec![format!("Error in pass {}: {}", pass_number, reason)],
            fallback_reason: Some(reason.to_string()),
            ..Default::default()
        },
    }
}

/// Runs single passes against an extraction service.
pub struct PassExecutor<A> {
    service: A,
    config: PipelineConfig,
    schema: Value,
}

impl<A: ExtractionService> PassExecutor<A> {
    pub fn new(service: A, config: PipelineConfig) -> Self {
        Self {
            service,
            config,
            schema: response_schema(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the service request for a pass.
    pub fn request(
        &self,
        documents: &DocumentSet,
        pass_number: u32,
        prior: &[PassResult],
        params: &ExtractionParams,
    ) -> ServiceRequest {
        ServiceRequest {
            pass_number,
            system_instruction: build_system_instruction(params, pass_number),
            user_prompt: build_pass_prompt(documents, pass_number, prior, params),
            schema: self.schema.clone(),
            model: self.config.model.clone(),
            temperature: self.config.temperature_for(pass_number),
            max_tokens: self.config.max_tokens,
        }
    }

    /// Execute one pass.
    ///
    /// Every failure becomes a `Fallback` outcome. The only error returned is
    /// a transport failure when `abort_on_service_failure` is set.
    pub async fn execute(
        &self,
        documents: &DocumentSet,
        pass_number: u32,
        prior: &[PassResult],
        params: &ExtractionParams,
    ) -> Result<PassOutcome> {
        let request = self.request(documents, pass_number, prior, params);

        info!(
            pass_number,
            passes_needed = params.passes_needed,
            pass_type = %params.pass_focus.kind,
            min_items = params.min_items_this_pass,
            max_items = params.max_items_this_pass,
            "Executing pass"
        );

        let raw = match self.service.complete(&request).await {
            Ok(raw) => raw,
            Err(e @ CrossdocError::Service(_)) if self.config.abort_on_service_failure => {
                return Err(e);
            }
            Err(e) => {
                let reason = match e {
                    CrossdocError::ContractViolation(msg) => FallbackReason::Malformed(msg),
                    CrossdocError::Service(msg) => FallbackReason::Service(msg),
                    other => FallbackReason::Service(other.to_string()),
                };
                return Ok(self.fallback(pass_number, params, reason));
            }
        };

        debug!(pass_number, response_len = raw.len(), "Received pass response");

        match parse_pass_response(&raw) {
            Ok(response) => {
                let result = transform_pass_response(response, pass_number, params);
                info!(
                    pass_number,
                    themes = result.themes.len(),
                    contradictions = result.contradictions.len(),
                    continuation_needed = result.continuation_needed,
                    "Pass validated"
                );
                Ok(PassOutcome::Validated(result))
            }
            Err(reason) => Ok(self.fallback(pass_number, params, reason)),
        }
    }

    fn fallback(
        &self,
        pass_number: u32,
        params: &ExtractionParams,
        reason: FallbackReason,
    ) -> PassOutcome {
        warn!(pass_number, reason = %reason, "Pass fell back to empty result");
        PassOutcome::Fallback {
            result: fallback_result(pass_number, params, &reason),
            reason,
        }
    }
}
