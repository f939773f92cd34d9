//! Crossdoc CLI
//!
//! Runs the multi-pass extraction against a job directory, prints resolved
//! anchors from a finished run, or shows the pass plan.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossdoc::{
    artifact_names, resolve_all, ArtifactStore, Document, DocumentSource, FsArtifactStore,
    FsDocumentSource, JobId, OpenAI, PassPlanner, PassProgress, Pipeline, PipelineConfig,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "crossdoc", about = "Cross-document theme and contradiction extraction")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every extraction pass and write the artifacts into the job directory
    Analyze {
        /// Job directory, or a job id under CROSSDOC_UPLOADS_DIR
        job: String,

        /// Stop the run when the extraction service is unreachable
        #[arg(long)]
        abort_on_failure: bool,
    },

    /// Print the resolved anchors of a finished run as JSON
    Anchors {
        /// Job directory, or a job id under CROSSDOC_UPLOADS_DIR
        job: String,
    },

    /// Print the pass plan without calling the extraction service
    Plan {
        /// Job directory, or a job id under CROSSDOC_UPLOADS_DIR
        job: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crossdoc=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Analyze {
            job,
            abort_on_failure,
        } => analyze(&config, &job, abort_on_failure).await,
        Command::Anchors { job } => anchors(&config, &job).await,
        Command::Plan { job } => plan(&config, &job).await,
    }
}

/// Split a job argument into the uploads root and the job id.
fn locate_job(config: &Config, job: &str) -> Result<(PathBuf, JobId)> {
    let path = Path::new(job);
    let dir = if path.is_dir() {
        path.to_path_buf()
    } else {
        config.uploads_dir.join(job)
    };

    if !dir.is_dir() {
        bail!("job directory not found: {}", dir.display());
    }

    let job_id = dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(JobId::new)
        .with_context(|| format!("cannot derive a job id from {}", dir.display()))?;
    let root = dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok((root, job_id))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn analyze(config: &Config, job: &str, abort_on_failure: bool) -> Result<()> {
    let (root, job_id) = locate_job(config, job)?;
    let documents = FsDocumentSource::new(&root)
        .load_documents(&job_id)
        .await
        .context("Failed to load documents")?;

    let mut service = OpenAI::new(config.require_api_key()?);
    if let Some(url) = &config.base_url {
        service = service.with_base_url(url);
    }

    let mut pipeline_config =
        PipelineConfig::default().with_abort_on_service_failure(abort_on_failure);
    if let Some(model) = &config.model {
        pipeline_config = pipeline_config.with_model(model);
    }

    let pipeline = Pipeline::new(service, FsArtifactStore::new(&root), pipeline_config);

    let (tx, mut rx) = mpsc::unbounded_channel::<PassProgress>();
    let progress = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            info!(
                pass = update.pass_number,
                passes_needed = update.passes_needed,
                pass_type = %update.pass_type,
                fallback = update.fallback,
                progress = update.percent(),
                "pass complete"
            );
        }
    });

    let output = pipeline
        .run(&job_id, &documents, Some(&tx))
        .await
        .context("Extraction run failed")?;
    drop(tx);
    let _ = progress.await;

    info!(
        job_id = %job_id,
        artifact = %root.join(job_id.as_str()).join(artifact_names::MERGED).display(),
        "analysis complete"
    );
    print_json(&output.summary)
}

async fn anchors(config: &Config, job: &str) -> Result<()> {
    let (root, job_id) = locate_job(config, job)?;
    let source = FsDocumentSource::new(&root);
    let documents = source
        .load_documents(&job_id)
        .await
        .context("Failed to load documents")?;

    let report = FsArtifactStore::new(&root)
        .load_merged(&job_id)
        .await?
        .with_context(|| format!("{} not found; run `crossdoc analyze` first", artifact_names::MERGED))?;

    let mut shared: Vec<Arc<Document>> = documents.shared().to_vec();
    for name in report.referenced_documents() {
        if documents.get(&name).is_some() {
            continue;
        }
        match source.find_elsewhere(&job_id, &name).await {
            Ok(Some(doc)) => shared.push(Arc::new(doc)),
            Ok(None) => warn!(document = %name, "cited document not found"),
            Err(e) => warn!(document = %name, error = %e, "cited document lookup failed"),
        }
    }

    let resolved = resolve_all(&shared, Arc::new(report)).await;
    print_json(&resolved)
}

#[derive(Serialize)]
struct PlanOutput {
    file_count: usize,
    total_content_length: usize,
    estimated_concepts: usize,
    passes_needed: u32,
    passes: Vec<crossdoc::ExtractionParams>,
}

async fn plan(config: &Config, job: &str) -> Result<()> {
    let (root, job_id) = locate_job(config, job)?;
    let documents = FsDocumentSource::new(&root)
        .load_documents(&job_id)
        .await
        .context("Failed to load documents")?;

    let planner = PassPlanner::new(&documents);
    let output = PlanOutput {
        file_count: documents.len(),
        total_content_length: documents.total_chars(),
        estimated_concepts: planner.estimated_concepts(),
        passes_needed: planner.passes_needed(),
        passes: (1..=planner.passes_needed())
            .map(|pass| planner.params(pass))
            .collect(),
    };
    print_json(&output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_uploads(dir: &Path) -> Config {
        Config {
            api_key: None,
            base_url: None,
            model: None,
            uploads_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_locate_job_by_path_and_by_id() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("job-1")).unwrap();
        let config = config_with_uploads(tmp.path());

        let by_path = tmp.path().join("job-1");
        let (root, id) = locate_job(&config, by_path.to_str().unwrap()).unwrap();
        assert_eq!(root, tmp.path());
        assert_eq!(id.as_str(), "job-1");

        let (root, id) = locate_job(&config, "job-1").unwrap();
        assert_eq!(root, tmp.path());
        assert_eq!(id.as_str(), "job-1");

        assert!(locate_job(&config, "missing").is_err());
    }
}
