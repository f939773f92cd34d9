//! Testing utilities including a mock extraction service.
//!
//! These are useful for testing applications that use the crossdoc library
//! without making real LLM calls.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{CrossdocError, Result};
use crate::traits::ai::{ExtractionService, ServiceRequest};
use crate::types::{
    finding::{Contradiction, Theme},
    pass::PassKind,
};

/// What the mock answers for one pass.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this body verbatim
    Body(String),

    /// Fail with `CrossdocError::Service`
    ServiceFailure(String),
}

/// A mock extraction service for testing.
///
/// Replies are scripted per pass number. Unscripted passes get an empty,
/// valid response that asks for no continuation.
#[derive(Default, Clone)]
pub struct MockExtractionService {
    replies: Arc<RwLock<HashMap<u32, MockReply>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<ServiceRequest>>>,
}

impl MockExtractionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `pass_number` with a prepared response.
    pub fn with_response(self, pass_number: u32, response: MockPassResponse) -> Self {
        self.with_reply(pass_number, MockReply::Body(response.to_json()))
    }

    /// Answer `pass_number` with a raw body (which need not be valid JSON).
    pub fn with_raw(self, pass_number: u32, body: impl Into<String>) -> Self {
        self.with_reply(pass_number, MockReply::Body(body.into()))
    }

    /// Fail `pass_number` at the transport level.
    pub fn fail_pass(self, pass_number: u32, message: impl Into<String>) -> Self {
        self.with_reply(pass_number, MockReply::ServiceFailure(message.into()))
    }

    fn with_reply(self, pass_number: u32, reply: MockReply) -> Self {
        self.replies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pass_number, reply);
        self
    }

    /// Get all requests made to this mock.
    pub fn calls(&self) -> Vec<ServiceRequest> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pass numbers requested so far, in order.
    pub fn requested_passes(&self) -> Vec<u32> {
        self.calls().iter().map(|c| c.pass_number).collect()
    }
}

#[async_trait]
impl ExtractionService for MockExtractionService {
    async fn complete(&self, request: &ServiceRequest) -> Result<String> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let reply = self
            .replies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.pass_number)
            .cloned();

        match reply {
            Some(MockReply::Body(body)) => Ok(body),
            Some(MockReply::ServiceFailure(message)) => Err(CrossdocError::Service(message)),
            None => Ok(MockPassResponse::new(request.pass_number).to_json()),
        }
    }
}

/// Builder for a well-formed pass response body.
#[derive(Debug, Clone)]
pub struct MockPassResponse {
    pass_number: u32,
    pass_type: PassKind,
    continuation_needed: bool,
    files_analyzed: usize,
    total_comparisons_made: u64,
    themes: Vec<Theme>,
    contradictions: Vec<Contradiction>,
    unique_concepts: Vec<(String, u64)>,
}

impl MockPassResponse {
    pub fn new(pass_number: u32) -> Self {
        Self {
            pass_number,
            pass_type: PassKind::BroadThemes,
            continuation_needed: false,
            files_analyzed: 0,
            total_comparisons_made: 0,
            themes: Vec::new(),
            contradictions: Vec::new(),
            unique_concepts: Vec::new(),
        }
    }

    pub fn with_continuation(mut self, needed: bool) -> Self {
        self.continuation_needed = needed;
        self
    }

    pub fn with_pass_type(mut self, kind: PassKind) -> Self {
        self.pass_type = kind;
        self
    }

    pub fn with_counts(mut self, files_analyzed: usize, comparisons: u64) -> Self {
        self.files_analyzed = files_analyzed;
        self.total_comparisons_made = comparisons;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.themes.push(theme);
        self
    }

    pub fn with_contradiction(mut self, contradiction: Contradiction) -> Self {
        self.contradictions.push(contradiction);
        self
    }

    pub fn with_unique_concepts(mut self, filename: impl Into<String>, count: u64) -> Self {
        self.unique_concepts.push((filename.into(), count));
        self
    }

    /// Serialize in the extraction service's wire format.
    pub fn to_json(&self) -> String {
        let items = (self.themes.len() + self.contradictions.len()) as u64;
        let unique_concepts: Vec<_> = self
            .unique_concepts
            .iter()
            .map(|(filename, count)| json!({"filename": filename, "unique_concept_count": count}))
            .collect();

        json!({
            "pass_metadata": {
                "pass_number": self.pass_number,
                "pass_type": self.pass_type,
                "items_extracted": items,
                "continuation_needed": self.continuation_needed,
                "areas_for_deeper_analysis": [],
            },
            "analysis_metadata": {
                "files_analyzed": self.files_analyzed,
                "total_comparisons_made": self.total_comparisons_made,
                "extraction_completeness": "partial",
                "total_themes_found": self.themes.len(),
                "total_contradictions_found": self.contradictions.len(),
                "average_themes_per_file": null,
                "coverage_percentage": null,
            },
            "common_themes": self.themes,
            "contradictions": self.contradictions,
            "extraction_summary": {
                "files_with_most_connections": [],
                "unique_concepts_per_file": unique_concepts,
                "unexplored_areas": [],
            },
        })
        .to_string()
    }
}
