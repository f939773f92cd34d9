//! OpenAI-compatible implementation of the `ExtractionService` trait.
//!
//! Sends each pass as a chat completion with a strict `json_schema`
//! response format. Works against any endpoint speaking the same API.
//!
//! # Example
//!
//! ```rust,ignore
//! use crossdoc::ai::OpenAI;
//!
//! let service = OpenAI::from_env()?.with_base_url("http://localhost:8080/v1");
//! let pipeline = Pipeline::new(service, artifacts, PipelineConfig::default());
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CrossdocError, Result};
use crate::traits::ai::{ExtractionService, ServiceRequest};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Name the schema is registered under in the request.
const SCHEMA_NAME: &str = "pass_response";

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct OpenAI {
    client: Client,
    api_key: SecretString,
    base_url: String,

    /// Overrides the model named in each request when set
    model: Option<String>,
}

impl OpenAI {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CrossdocError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, local servers, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Force a model regardless of the pipeline configuration.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request<'a>(&'a self, request: &'a ServiceRequest) -> StructuredRequest<'a> {
        StructuredRequest {
            model: self.model.as_deref().unwrap_or(&request.model),
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: SCHEMA_NAME,
                    strict: true,
                    schema: &request.schema,
                },
            },
        }
    }
}

#[async_trait]
impl ExtractionService for OpenAI {
    async fn complete(&self, request: &ServiceRequest) -> Result<String> {
        let body = self.build_request(request);
        debug!(
            pass_number = request.pass_number,
            model = body.model,
            temperature = body.temperature,
            "sending structured completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CrossdocError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CrossdocError::Service(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| CrossdocError::Service(e.to_string()))?;

        first_content(chat_response)
    }
}

/// Content of the first choice. A refusal or empty answer breaks the
/// response contract rather than the transport.
fn first_content(response: ChatResponse) -> Result<String> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| CrossdocError::ContractViolation("no choices in response".into()))?;

    if let Some(refusal) = message.refusal {
        return Err(CrossdocError::ContractViolation(format!(
            "model refused: {}",
            refusal
        )));
    }

    message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| CrossdocError::ContractViolation("empty response content".into()))
}

// Request/Response types

#[derive(Serialize)]
struct StructuredRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'static str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}
