//! Typed errors for the crossdoc library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur while running or querying an analysis job.
#[derive(Debug, Error)]
pub enum CrossdocError {
    /// Extraction service unreachable or failed at the transport level
    #[error("extraction service unavailable: {0}")]
    Service(String),

    /// Extraction service answered, but the answer broke the response contract
    #[error("extraction service contract violation: {0}")]
    ContractViolation(String),

    /// A job needs at least one document
    #[error("document set is empty")]
    EmptyDocumentSet,

    /// Document names must be unique within a job
    #[error("duplicate document name: {name}")]
    DuplicateDocument { name: String },

    /// An artifact expected after a run was not written
    #[error("artifact {artifact} missing for job {job_id}")]
    ArtifactMissing { job_id: String, artifact: String },

    /// Job directory or job entry does not exist
    #[error("job not found: {job_id}")]
    JobNotFound { job_id: String },

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl CrossdocError {
    /// Whether this error should flip a job to `failed`.
    ///
    /// Contract violations are recovered per pass and never fail a job
    /// on their own.
    pub fn is_job_fatal(&self) -> bool {
        !matches!(self, CrossdocError::ContractViolation(_))
    }
}

/// Result type alias for crossdoc operations.
pub type Result<T> = std::result::Result<T, CrossdocError>;
