//! Job types - status reported to pollers and the results bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::report::MergedReport;

/// Identifier of one analysis job (also its directory name on disk).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh, time-ordered identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Lifecycle state of a job as seen by status pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    NotFound,
    Processing {
        /// 0-100
        progress: u8,
        started_at: DateTime<Utc>,
    },
    Completed {
        completed_at: DateTime<Utc>,
    },
    Failed {
        error: String,
        completed_at: DateTime<Utc>,
    },
}

impl JobStatus {
    /// A freshly started job.
    pub fn started() -> Self {
        JobStatus::Processing {
            progress: 0,
            started_at: Utc::now(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        JobStatus::Failed {
            error: error.into(),
            completed_at: Utc::now(),
        }
    }

    pub fn completed() -> Self {
        JobStatus::Completed {
            completed_at: Utc::now(),
        }
    }

    /// Completion time if finished, otherwise start time. Drives TTL eviction.
    pub fn last_transition(&self) -> Option<DateTime<Utc>> {
        match self {
            JobStatus::NotFound => None,
            JobStatus::Processing { started_at, .. } => Some(*started_at),
            JobStatus::Completed { completed_at } | JobStatus::Failed { completed_at, .. } => {
                Some(*completed_at)
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }
}

/// A document as presented to callers, with its original upload name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFile {
    /// Stored name, as cited by findings
    pub filename: String,

    /// Name the user uploaded it under (falls back to `filename`)
    pub original_name: String,

    pub content: String,
}

/// The merged report together with every document it cites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResults {
    #[serde(flatten)]
    pub report: MergedReport,

    pub files: Vec<JobFile>,
}
