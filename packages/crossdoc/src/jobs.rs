//! Job runner and query surface.
//!
//! Starts extraction runs in the background, tracks their status in a
//! `JobStore`, and assembles the results bundle pollers fetch once a run
//! completes.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{CrossdocError, Result};
use crate::traits::{
    runner::{ExtractionRunner, PassProgress},
    store::{artifact_names, ArtifactStore, DocumentSource, JobStore},
};
use crate::types::{
    config::JobStoreConfig,
    document::DocumentSet,
    job::{JobFile, JobId, JobResults, JobStatus},
    report::MergedReport,
};

/// Runs jobs and answers status queries.
#[derive(Clone)]
pub struct JobRunner {
    runner: Arc<dyn ExtractionRunner>,
    documents: Arc<dyn DocumentSource>,
    artifacts: Arc<dyn ArtifactStore>,
    jobs: Arc<dyn JobStore>,
    config: JobStoreConfig,
}

impl JobRunner {
    pub fn new(
        runner: Arc<dyn ExtractionRunner>,
        documents: Arc<dyn DocumentSource>,
        artifacts: Arc<dyn ArtifactStore>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            runner,
            documents,
            artifacts,
            jobs,
            config: JobStoreConfig::default(),
        }
    }

    pub fn with_config(mut self, config: JobStoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Mark the job as processing and run it in the background.
    ///
    /// The returned handle resolves once the job's final status is stored.
    pub async fn start(&self, job_id: JobId) -> Result<JoinHandle<()>> {
        self.jobs.put_status(&job_id, JobStatus::started()).await?;
        info!(job_id = %job_id, "job started");

        let this = self.clone();
        Ok(tokio::spawn(async move {
            let final_status = match this.execute(&job_id).await {
                Ok(()) => JobStatus::completed(),
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "job failed");
                    JobStatus::failed(e.to_string())
                }
            };
            if let Err(e) = this.jobs.put_status(&job_id, final_status).await {
                error!(job_id = %job_id, error = %e, "failed to store final job status");
            }
        }))
    }

    async fn execute(&self, job_id: &JobId) -> Result<()> {
        let documents = self.documents.load_documents(job_id).await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<PassProgress>();
        let jobs = Arc::clone(&self.jobs);
        let progress_job = job_id.clone();
        let forward = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                if let Err(e) = jobs.update_progress(&progress_job, update.percent()).await {
                    warn!(job_id = %progress_job, error = %e, "progress update failed");
                }
            }
        });

        let outcome = self.runner.run_extraction(job_id, &documents, Some(tx)).await;
        if let Err(e) = forward.await {
            warn!(job_id = %job_id, error = %e, "progress task ended abnormally");
        }
        outcome?;

        let report = self
            .artifacts
            .load_merged(job_id)
            .await?
            .ok_or_else(|| CrossdocError::ArtifactMissing {
                job_id: job_id.to_string(),
                artifact: artifact_names::MERGED.to_string(),
            })?;

        let files = self.collect_files(job_id, &documents, &report).await?;
        info!(
            job_id = %job_id,
            themes = report.themes.len(),
            contradictions = report.contradictions.len(),
            files = files.len(),
            "job results ready"
        );

        self.jobs
            .put_results(job_id, JobResults { report, files })
            .await
    }

    /// The job's documents, then any cited document found in a sibling job.
    async fn collect_files(
        &self,
        job_id: &JobId,
        documents: &DocumentSet,
        report: &MergedReport,
    ) -> Result<Vec<JobFile>> {
        let mapping: HashMap<String, String> = self.documents.filename_mapping(job_id).await?;
        let original_name = |name: &str| mapping.get(name).cloned().unwrap_or_else(|| name.to_string());

        let mut files: Vec<JobFile> = documents
            .iter()
            .map(|doc| JobFile {
                filename: doc.name.clone(),
                original_name: original_name(&doc.name),
                content: doc.text.clone(),
            })
            .collect();

        for name in report.referenced_documents() {
            if documents.get(&name).is_some() {
                continue;
            }
            match self.documents.find_elsewhere(job_id, &name).await {
                Ok(Some(doc)) => files.push(JobFile {
                    original_name: original_name(&doc.name),
                    filename: doc.name,
                    content: doc.text,
                }),
                Ok(None) => debug!(job_id = %job_id, document = %name, "cited document not found"),
                Err(e) => warn!(
                    job_id = %job_id,
                    document = %name,
                    error = %e,
                    "cited document lookup failed, skipping"
                ),
            }
        }

        Ok(files)
    }

    /// Current status of a job.
    pub async fn status(&self, job_id: &JobId) -> Result<JobStatus> {
        self.jobs.status(job_id).await
    }

    /// Results bundle of a completed job.
    pub async fn results(&self, job_id: &JobId) -> Result<Option<Arc<JobResults>>> {
        self.jobs.results(job_id).await
    }

    /// Evict expired jobs once.
    pub async fn sweep_expired(&self) -> Result<usize> {
        self.jobs.sweep_expired(self.config.result_ttl).await
    }

    /// Run `sweep_expired` every `sweep_interval` until cancelled.
    pub fn spawn_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.config.sweep_interval);
            interval.tick().await; // Skip first immediate tick

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        match this.sweep_expired().await {
                            Ok(0) => {}
                            Ok(evicted) => info!(evicted, "expired jobs swept"),
                            Err(e) => warn!(error = %e, "job sweep failed"),
                        }
                    }
                }
            }
        })
    }
}
