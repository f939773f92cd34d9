//! Run orchestration - the sequential pass loop.
//!
//! Pass `n + 1` never starts before pass `n` has validated or fallen back,
//! because every prompt carries what the earlier passes found. Between
//! passes the loop waits a fixed delay to stay under upstream rate limits.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::Result;
use crate::pipeline::{
    execute::PassExecutor,
    merge::ResultMerger,
    plan::{PassPlanner, MIN_PASSES},
    summary::build_summary,
};
use crate::traits::{
    ai::ExtractionService,
    runner::{ExtractionRunner, PassProgress, ProgressSender},
    store::ArtifactStore,
};
use crate::types::{
    config::PipelineConfig,
    document::DocumentSet,
    job::JobId,
    pass::PassResult,
    report::{MergedReport, SummaryReport},
};

/// Wait between a finished pass and the next request.
pub const INTER_PASS_DELAY: Duration = Duration::from_secs(1);

/// Continuation policy, evaluated after every pass.
///
/// Stops once the service asks for no more after the minimum number of
/// passes, or once the planned pass count is reached.
pub fn should_stop(result: &PassResult, passes_needed: u32) -> bool {
    (!result.continuation_needed && result.pass_number >= MIN_PASSES)
        || result.pass_number >= passes_needed
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub passes: Vec<PassResult>,
    pub report: MergedReport,
    pub summary: SummaryReport,
}

/// The multi-pass extraction pipeline.
pub struct Pipeline<A, S> {
    executor: PassExecutor<A>,
    artifacts: S,
}

impl<A: ExtractionService, S: ArtifactStore> Pipeline<A, S> {
    pub fn new(service: A, artifacts: S, config: PipelineConfig) -> Self {
        Self {
            executor: PassExecutor::new(service, config),
            artifacts,
        }
    }

    /// Run every pass, merge, and write the artifacts.
    pub async fn run(
        &self,
        job_id: &JobId,
        documents: &DocumentSet,
        progress: Option<&ProgressSender>,
    ) -> Result<RunOutput> {
        let planner = PassPlanner::new(documents);
        let passes_needed = planner.passes_needed();

        info!(
            job_id = %job_id,
            documents = documents.len(),
            estimated_concepts = planner.estimated_concepts(),
            passes_needed,
            "Starting extraction run"
        );

        let mut passes: Vec<PassResult> = Vec::new();
        let mut pass_number = 1;

        loop {
            let params = planner.params(pass_number);
            let outcome = self
                .executor
                .execute(documents, pass_number, &passes, &params)
                .await?;
            let fallback = outcome.is_fallback();
            let result = outcome.into_result();

            if self.executor.config().write_pass_artifacts {
                self.artifacts.store_pass(job_id, &result).await?;
            }

            if let Some(tx) = progress {
                let update = PassProgress {
                    pass_number,
                    passes_needed,
                    pass_type: result.pass_type,
                    fallback,
                };
                if tx.send(update).is_err() {
                    debug!(job_id = %job_id, "Progress receiver dropped");
                }
            }

            let stop = should_stop(&result, passes_needed);
            passes.push(result);

            if stop {
                info!(job_id = %job_id, passes = pass_number, "Extraction passes finished");
                break;
            }

            pass_number += 1;
            tokio::time::sleep(INTER_PASS_DELAY).await;
        }

        let report = ResultMerger::new(documents.len()).merge(&passes);
        self.artifacts.store_merged(job_id, &report).await?;

        let summary = build_summary(&report, &passes, documents.len());
        self.artifacts.store_summary(job_id, &summary).await?;

        Ok(RunOutput {
            passes,
            report,
            summary,
        })
    }
}

#[async_trait]
impl<A: ExtractionService, S: ArtifactStore> ExtractionRunner for Pipeline<A, S> {
    async fn run_extraction(
        &self,
        job_id: &JobId,
        documents: &DocumentSet,
        progress: Option<ProgressSender>,
    ) -> Result<MergedReport> {
        self.run(job_id, documents, progress.as_ref())
            .await
            .map(|output| output.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrossdocError;
    use crate::stores::memory::MemoryArtifactStore;
    use crate::testing::{MockExtractionService, MockPassResponse};
    use crate::types::{
        document::Document,
        finding::{Instance, TargetRef, Theme},
        pass::PassKind,
    };
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn three_documents() -> DocumentSet {
        DocumentSet::new(vec![
            Document::new("a.md", "The system uses a retry queue for failures."),
            Document::new("b.md", "Failures are dropped without any retry at all."),
            Document::new("c.md", "Backoff doubles the wait after every failure."),
        ])
        .unwrap()
    }

    fn retry_theme(label: &str, instances: usize) -> Theme {
        let instance = Instance::new("a.md", "retry queue for failures", "both retry")
            .with_target(TargetRef::new("b.md", "dropped without any retry"));
        Theme::new(label, vec![instance; instances])
    }

    #[tokio::test(start_paused = true)]
    async fn test_continues_after_delay_when_more_is_needed() {
        let docs = three_documents();
        assert_eq!(PassPlanner::new(&docs).passes_needed(), 4);

        let mock = MockExtractionService::new()
            .with_response(1, MockPassResponse::new(1).with_continuation(true))
            .with_response(2, MockPassResponse::new(2).with_continuation(false));
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let pipeline = Pipeline::new(mock.clone(), artifacts.clone(), PipelineConfig::default());

        let started = Instant::now();
        let output = pipeline.run(&JobId::new("job"), &docs, None).await.unwrap();

        // pass 2 asked for no more, but the floor of three passes holds
        assert_eq!(mock.requested_passes(), vec![1, 2, 3]);
        assert_eq!(output.passes.len(), 3);
        assert!(started.elapsed() >= INTER_PASS_DELAY * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_does_not_abort_run() {
        let docs = three_documents();
        let mock = MockExtractionService::new()
            .with_response(
                1,
                MockPassResponse::new(1)
                    .with_continuation(true)
                    .with_theme(retry_theme("Retry", 1)),
            )
            .fail_pass(2, "upstream timed out")
            .with_response(3, MockPassResponse::new(3).with_theme(retry_theme("retry", 3)));
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let pipeline = Pipeline::new(mock.clone(), artifacts.clone(), PipelineConfig::default());

        let job = JobId::new("job");
        let output = pipeline.run(&job, &docs, None).await.unwrap();

        assert_eq!(mock.requested_passes(), vec![1, 2, 3]);
        assert!(output.passes[1].is_fallback());
        assert_eq!(output.passes[1].items_extracted, 0);
        assert_eq!(output.report.themes.len(), 1);
        assert_eq!(output.report.themes[0].instances.len(), 3);

        let stored = artifacts.load_pass(&job, 2).await.unwrap().unwrap();
        assert!(stored.is_fallback());
        assert!(artifacts.load_merged(&job).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_planned_passes() {
        let docs = three_documents();
        let mut mock = MockExtractionService::new();
        for pass in 1..=6 {
            mock = mock.with_response(pass, MockPassResponse::new(pass).with_continuation(true));
        }
        let pipeline = Pipeline::new(
            mock.clone(),
            MemoryArtifactStore::new(),
            PipelineConfig::default(),
        );

        let output = pipeline.run(&JobId::new("job"), &docs, None).await.unwrap();

        assert_eq!(mock.requested_passes(), vec![1, 2, 3, 4]);
        assert_eq!(output.report.analysis_metadata.total_passes, 4);
        assert_eq!(
            output.passes.iter().map(|p| p.pass_type).collect::<Vec<_>>(),
            vec![
                PassKind::BroadThemes,
                PassKind::TechnicalDetails,
                PassKind::EdgeCases,
                PassKind::CrossReferences
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_reported_per_pass() {
        let docs = three_documents();
        let pipeline = Pipeline::new(
            MockExtractionService::new().fail_pass(1, "down"),
            MemoryArtifactStore::new(),
            PipelineConfig::default(),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        pipeline.run(&JobId::new("job"), &docs, Some(&tx)).await.unwrap();
        drop(tx);

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }

        assert_eq!(updates.len(), 3);
        assert!(updates[0].fallback);
        assert_eq!(updates[0].percent(), 25);
        assert_eq!(updates[2].percent(), 75);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_on_service_failure() {
        let docs = three_documents();
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let pipeline = Pipeline::new(
            MockExtractionService::new().fail_pass(2, "down"),
            artifacts.clone(),
            PipelineConfig::default().with_abort_on_service_failure(true),
        );

        let job = JobId::new("job");
        let err = pipeline.run(&job, &docs, None).await.unwrap_err();

        assert!(matches!(err, CrossdocError::Service(_)));
        assert!(artifacts.load_merged(&job).await.unwrap().is_none());
    }

    #[test]
    fn test_should_stop() {
        let mut result = PassResult {
            pass_number: 2,
            pass_type: PassKind::TechnicalDetails,
            items_extracted: 0,
            continuation_needed: false,
            themes: vec![],
            contradictions: vec![],
            metadata: Default::default(),
        };
        assert!(!should_stop(&result, 5));

        result.pass_number = 3;
        assert!(should_stop(&result, 5));

        result.continuation_needed = true;
        assert!(!should_stop(&result, 5));
        assert!(should_stop(&result, 3));
    }
}
