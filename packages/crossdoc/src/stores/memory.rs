//! In-memory storage for job state and run artifacts.
//!
//! `MemoryJobStore` is the process-wide registry pollers read from.
//! `MemoryArtifactStore` keeps artifacts for tests and one-shot runs;
//! data is lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{CrossdocError, Result};
use crate::traits::store::{ArtifactStore, JobStore};
use crate::types::{
    job::{JobId, JobResults, JobStatus},
    pass::PassResult,
    report::{MergedReport, SummaryReport},
};

/// Concurrent job registry.
///
/// Each job has one writer (its runner); reads never block other jobs.
#[derive(Default)]
pub struct MemoryJobStore {
    statuses: DashMap<JobId, JobStatus>,
    results: DashMap<JobId, Arc<JobResults>>,
}

impl MemoryJobStore {
    /// Create a new empty job store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked jobs.
    pub fn job_count(&self) -> usize {
        self.statuses.len()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put_status(&self, job_id: &JobId, status: JobStatus) -> Result<()> {
        self.statuses.insert(job_id.clone(), status);
        Ok(())
    }

    async fn status(&self, job_id: &JobId) -> Result<JobStatus> {
        Ok(self
            .statuses
            .get(job_id)
            .map(|s| s.value().clone())
            .unwrap_or(JobStatus::NotFound))
    }

    async fn update_progress(&self, job_id: &JobId, progress: u8) -> Result<()> {
        if let Some(mut entry) = self.statuses.get_mut(job_id) {
            if let JobStatus::Processing { progress: p, .. } = entry.value_mut() {
                *p = progress.min(100);
            }
        }
        Ok(())
    }

    async fn put_results(&self, job_id: &JobId, results: JobResults) -> Result<()> {
        self.results.insert(job_id.clone(), Arc::new(results));
        Ok(())
    }

    async fn results(&self, job_id: &JobId) -> Result<Option<Arc<JobResults>>> {
        Ok(self.results.get(job_id).map(|r| Arc::clone(r.value())))
    }

    async fn sweep_expired(&self, ttl: Duration) -> Result<usize> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CrossdocError::Config(format!("invalid ttl: {}", e)))?;
        let cutoff = Utc::now() - ttl;

        let expired: Vec<JobId> = self
            .statuses
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .last_transition()
                    .is_some_and(|at| at < cutoff)
            })
            .map(|entry| entry.key().clone())
            .collect();

        for job_id in &expired {
            self.statuses.remove(job_id);
            self.results.remove(job_id);
        }

        if !expired.is_empty() {
            debug!(evicted = expired.len(), "swept expired jobs");
        }
        Ok(expired.len())
    }
}

#[derive(Debug, Default, Clone)]
struct JobArtifacts {
    passes: BTreeMap<u32, PassResult>,
    merged: Option<MergedReport>,
    summary: Option<SummaryReport>,
}

/// Artifact store that keeps everything in memory.
#[derive(Default)]
pub struct MemoryArtifactStore {
    jobs: DashMap<JobId, JobArtifacts>,
}

impl MemoryArtifactStore {
    /// Create a new empty artifact store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass numbers stored for a job, ascending.
    pub fn pass_numbers(&self, job_id: &JobId) -> Vec<u32> {
        self.jobs
            .get(job_id)
            .map(|a| a.passes.keys().copied().collect())
            .unwrap_or_default()
    }

    /// The stored summary artifact of a job.
    pub fn summary(&self, job_id: &JobId) -> Option<SummaryReport> {
        self.jobs.get(job_id).and_then(|a| a.summary.clone())
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn store_pass(&self, job_id: &JobId, result: &PassResult) -> Result<()> {
        self.jobs
            .entry(job_id.clone())
            .or_default()
            .passes
            .insert(result.pass_number, result.clone());
        Ok(())
    }

    async fn store_merged(&self, job_id: &JobId, report: &MergedReport) -> Result<()> {
        self.jobs.entry(job_id.clone()).or_default().merged = Some(report.clone());
        Ok(())
    }

    async fn store_summary(&self, job_id: &JobId, summary: &SummaryReport) -> Result<()> {
        self.jobs.entry(job_id.clone()).or_default().summary = Some(summary.clone());
        Ok(())
    }

    async fn load_pass(&self, job_id: &JobId, pass_number: u32) -> Result<Option<PassResult>> {
        Ok(self
            .jobs
            .get(job_id)
            .and_then(|a| a.passes.get(&pass_number).cloned()))
    }

    async fn load_merged(&self, job_id: &JobId) -> Result<Option<MergedReport>> {
        Ok(self.jobs.get(job_id).and_then(|a| a.merged.clone()))
    }
}
