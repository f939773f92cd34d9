//! Integration tests for a full extraction run.
//!
//! These tests verify the end-to-end workflow:
//! 1. Load documents from a job directory
//! 2. Run every pass against a scripted service
//! 3. Merge and write the artifacts
//! 4. Resolve anchors for each document

use std::path::Path;
use std::sync::Arc;

use crossdoc::{
    artifact_names,
    resolve_all,
    stores::{FsArtifactStore, FsDocumentSource},
    testing::{MockExtractionService, MockPassResponse},
    Contradiction, DocumentSource, FindingKind, Instance, JobId, Pipeline, PipelineConfig,
    TargetRef, Theme,
};

/// Helper to create a job directory with documents.
async fn write_job(root: &Path, job: &str, files: &[(&str, &str)]) {
    let dir = root.join(job);
    tokio::fs::create_dir_all(&dir).await.unwrap();
    for (name, content) in files {
        tokio::fs::write(dir.join(name), content).await.unwrap();
    }
}

fn retry_theme(label: &str, instances: usize) -> Theme {
    let instance = Instance::new("a.md", "retry queue for failures", "both describe retries")
        .with_target(TargetRef::new("b.md", "dropped without any retry"));
    Theme::new(label, vec![instance; instances])
}

#[tokio::test(start_paused = true)]
async fn test_run_writes_artifacts_and_resolves_anchors() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_job(
        tmp.path(),
        "job",
        &[
            ("a.md", "# Design\n\nThe system uses a retry queue for failures."),
            ("b.md", "Failures are dropped without any retry at all."),
        ],
    )
    .await;

    let contradiction = Contradiction::new(
        "Failure handling differs",
        vec![Instance::new("b.md", "Failures are dropped without any retry", "conflict")
            .with_target(TargetRef::new("a.md", "retry queue for failures"))],
    );
    let service = MockExtractionService::new()
        .with_response(
            1,
            MockPassResponse::new(1)
                .with_continuation(true)
                .with_counts(2, 1)
                .with_theme(retry_theme("Microservices", 2))
                .with_unique_concepts("a.md", 4),
        )
        .with_response(
            2,
            MockPassResponse::new(2)
                .with_continuation(true)
                .with_counts(2, 3)
                .with_theme(retry_theme("microservices", 5))
                .with_contradiction(contradiction),
        );

    let job = JobId::new("job");
    let source = FsDocumentSource::new(tmp.path());
    let artifacts = Arc::new(FsArtifactStore::new(tmp.path()));
    let documents = source.load_documents(&job).await.unwrap();

    let pipeline = Pipeline::new(service.clone(), artifacts.clone(), PipelineConfig::default());
    let output = pipeline.run(&job, &documents, None).await.unwrap();

    // pass 3 is unscripted and asks for no more
    assert_eq!(service.requested_passes(), vec![1, 2, 3]);

    let report = &output.report;
    assert_eq!(report.themes.len(), 1);
    assert_eq!(report.themes[0].label, "microservices");
    assert_eq!(report.themes[0].instances.len(), 5);
    assert_eq!(report.contradictions.len(), 1);
    assert_eq!(report.analysis_metadata.total_comparisons_made, 4);
    assert_eq!(report.extraction_summary.unique_concepts_per_file.len(), 1);

    for name in [
        artifact_names::pass(1),
        artifact_names::pass(3),
        artifact_names::MERGED.to_string(),
        artifact_names::SUMMARY.to_string(),
    ] {
        assert!(tmp.path().join("job").join(&name).exists(), "missing {}", name);
    }

    let resolved = resolve_all(documents.shared(), Arc::new(report.clone())).await;
    assert_eq!(resolved.len(), 2);

    let a = &resolved[0];
    assert_eq!(a.document, "a.md");
    assert_eq!(a.anchors.len(), 2);
    let text = &documents.get("a.md").unwrap().text;
    for anchor in &a.anchors {
        assert_eq!(&text[anchor.start..anchor.end], "retry queue for failures");
    }
    assert_eq!(a.anchors[0].finding_type, FindingKind::Theme);
    assert_eq!(a.anchors[0].target_doc.as_deref(), Some("b.md"));
    assert_eq!(a.anchors[1].finding_type, FindingKind::Contradiction);
    assert_eq!(a.anchors[1].target_doc.as_deref(), Some("b.md"));

    let b = &resolved[1];
    assert_eq!(b.anchors.len(), 2);
    assert_eq!(b.anchors[0].target_doc.as_deref(), Some("a.md"));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_pass_still_produces_report() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_job(tmp.path(), "job", &[("a.md", "one"), ("b.md", "two"), ("c.md", "three")]).await;

    let service = MockExtractionService::new()
        .with_raw(1, "this is not json")
        .with_response(2, MockPassResponse::new(2).with_theme(retry_theme("Retry", 1)));

    let job = JobId::new("job");
    let documents = FsDocumentSource::new(tmp.path())
        .load_documents(&job)
        .await
        .unwrap();
    let pipeline = Pipeline::new(
        service,
        FsArtifactStore::new(tmp.path()),
        PipelineConfig::default(),
    );

    let output = pipeline.run(&job, &documents, None).await.unwrap();

    assert!(output.passes[0].is_fallback());
    assert_eq!(output.passes[0].metadata.extraction_completeness, "failed");
    assert_eq!(output.report.themes.len(), 1);
    assert_eq!(output.summary.execution_summary.files_analyzed, 3);
}
