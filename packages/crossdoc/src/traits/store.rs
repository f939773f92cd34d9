//! Storage traits for job state, run artifacts, and job documents.
//!
//! The storage layer is split into focused traits:
//! - `JobStore`: status and results registry queried by pollers
//! - `ArtifactStore`: per-pass, merged, and summary artifacts of a run
//! - `DocumentSource`: the documents of a job and their original names

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::types::{
    document::{Document, DocumentSet},
    job::{JobId, JobResults, JobStatus},
    pass::PassResult,
    report::{MergedReport, SummaryReport},
};

/// Registry of job status and results.
///
/// Written by the job's runner, read concurrently by unrelated pollers.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Replace the status of a job.
    async fn put_status(&self, job_id: &JobId, status: JobStatus) -> Result<()>;

    /// Current status, `JobStatus::NotFound` if unknown.
    async fn status(&self, job_id: &JobId) -> Result<JobStatus>;

    /// Update progress of a processing job. No-op for other states.
    async fn update_progress(&self, job_id: &JobId, progress: u8) -> Result<()> {
        if let JobStatus::Processing { started_at, .. } = self.status(job_id).await? {
            self.put_status(
                job_id,
                JobStatus::Processing {
                    progress: progress.min(100),
                    started_at,
                },
            )
            .await?;
        }
        Ok(())
    }

    /// Store the results bundle of a completed job.
    async fn put_results(&self, job_id: &JobId, results: JobResults) -> Result<()>;

    /// Results bundle, if the job completed and has not been evicted.
    async fn results(&self, job_id: &JobId) -> Result<Option<Arc<JobResults>>>;

    /// Evict every job whose last transition is older than `ttl`.
    ///
    /// Returns the number of jobs evicted.
    async fn sweep_expired(&self, ttl: Duration) -> Result<usize>;
}

/// Well-known artifact names.
pub mod artifact_names {
    pub const MERGED: &str = "ai_file_analysis_complete.json";
    pub const SUMMARY: &str = "analysis_summary.json";
    pub const FILENAME_MAPPING: &str = "filename_mapping.json";

    pub fn pass(pass_number: u32) -> String {
        format!("pass_{}_results.json", pass_number)
    }
}

/// Sink (and source) for the JSON artifacts a run produces.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store_pass(&self, job_id: &JobId, result: &PassResult) -> Result<()>;

    async fn store_merged(&self, job_id: &JobId, report: &MergedReport) -> Result<()>;

    async fn store_summary(&self, job_id: &JobId, summary: &SummaryReport) -> Result<()>;

    async fn load_pass(&self, job_id: &JobId, pass_number: u32) -> Result<Option<PassResult>>;

    async fn load_merged(&self, job_id: &JobId) -> Result<Option<MergedReport>>;
}

/// Where a job's documents come from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load the primary document collection of a job.
    async fn load_documents(&self, job_id: &JobId) -> Result<DocumentSet>;

    /// Stored name → original upload name. Empty when no mapping exists.
    async fn filename_mapping(&self, job_id: &JobId) -> Result<HashMap<String, String>>;

    /// Look for a document outside the job's own collection.
    ///
    /// Used for documents a report cites that the job directory lacks.
    async fn find_elsewhere(&self, job_id: &JobId, name: &str) -> Result<Option<Document>>;
}

#[async_trait]
impl<T: ArtifactStore + ?Sized> ArtifactStore for Arc<T> {
    async fn store_pass(&self, job_id: &JobId, result: &PassResult) -> Result<()> {
        (**self).store_pass(job_id, result).await
    }

    async fn store_merged(&self, job_id: &JobId, report: &MergedReport) -> Result<()> {
        (**self).store_merged(job_id, report).await
    }

    async fn store_summary(&self, job_id: &JobId, summary: &SummaryReport) -> Result<()> {
        (**self).store_summary(job_id, summary).await
    }

    async fn load_pass(&self, job_id: &JobId, pass_number: u32) -> Result<Option<PassResult>> {
        (**self).load_pass(job_id, pass_number).await
    }

    async fn load_merged(&self, job_id: &JobId) -> Result<Option<MergedReport>> {
        (**self).load_merged(job_id).await
    }
}
