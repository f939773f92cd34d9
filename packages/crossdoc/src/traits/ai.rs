//! Extraction service trait - the LLM contract consumed by the pipeline.
//!
//! The pipeline needs exactly one capability from the model: take a system
//! instruction, a user prompt, and a JSON schema, and answer with JSON text.
//! Validation of that text is the pipeline's job, not the service's.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// One structured-output request.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    /// Pass this request belongs to (for logging and mocks)
    pub pass_number: u32,

    pub system_instruction: String,

    pub user_prompt: String,

    /// Strict JSON schema the answer must follow
    pub schema: serde_json::Value,

    pub model: String,

    pub temperature: f32,

    pub max_tokens: u32,
}

/// An LLM provider able to answer structured-output requests.
///
/// Implementations return the raw response body (expected to be JSON).
/// Transport failures are returned as `CrossdocError::Service`.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn complete(&self, request: &ServiceRequest) -> Result<String>;
}

#[async_trait]
impl<T: ExtractionService + ?Sized> ExtractionService for Arc<T> {
    async fn complete(&self, request: &ServiceRequest) -> Result<String> {
        (**self).complete(request).await
    }
}
