//! Filesystem storage rooted at an uploads directory.
//!
//! Each job owns `<root>/<job_id>/`: its `.md` documents, an optional
//! `filename_mapping.json`, and the pretty-printed JSON artifacts of a run.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{CrossdocError, Result};
use crate::traits::store::{artifact_names, ArtifactStore, DocumentSource};
use crate::types::{
    document::{Document, DocumentSet},
    job::JobId,
    pass::PassResult,
    report::{MergedReport, SummaryReport},
};

/// Extension of loadable documents.
pub const DOCUMENT_EXTENSION: &str = "md";

fn job_dir(root: &Path, job_id: &JobId) -> PathBuf {
    root.join(job_id.as_str())
}

/// Only bare file names are accepted, never paths.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Artifacts written as JSON files in the job directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path an artifact of a job is written to.
    pub fn artifact_path(&self, job_id: &JobId, name: &str) -> PathBuf {
        job_dir(&self.root, job_id).join(name)
    }

    async fn write<T: Serialize + ?Sized>(&self, job_id: &JobId, name: &str, value: &T) -> Result<()> {
        let dir = job_dir(&self.root, job_id);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?).await?;
        debug!(job_id = %job_id, path = %path.display(), "artifact written");
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store_pass(&self, job_id: &JobId, result: &PassResult) -> Result<()> {
        self.write(job_id, &artifact_names::pass(result.pass_number), result)
            .await
    }

    async fn store_merged(&self, job_id: &JobId, report: &MergedReport) -> Result<()> {
        self.write(job_id, artifact_names::MERGED, report).await?;
        info!(job_id = %job_id, "merged results saved");
        Ok(())
    }

    async fn store_summary(&self, job_id: &JobId, summary: &SummaryReport) -> Result<()> {
        self.write(job_id, artifact_names::SUMMARY, summary).await
    }

    async fn load_pass(&self, job_id: &JobId, pass_number: u32) -> Result<Option<PassResult>> {
        read_json(&self.artifact_path(job_id, &artifact_names::pass(pass_number))).await
    }

    async fn load_merged(&self, job_id: &JobId) -> Result<Option<MergedReport>> {
        read_json(&self.artifact_path(job_id, artifact_names::MERGED)).await
    }
}

/// Documents read from job directories under an uploads root.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Names of the document files in a directory, sorted.
    async fn document_names(dir: &Path) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn load_documents(&self, job_id: &JobId) -> Result<DocumentSet> {
        let dir = job_dir(&self.root, job_id);
        if !fs::try_exists(&dir).await? {
            return Err(CrossdocError::JobNotFound {
                job_id: job_id.to_string(),
            });
        }

        let mut documents = Vec::new();
        for name in Self::document_names(&dir).await? {
            let text = fs::read_to_string(dir.join(&name)).await?;
            documents.push(Document::new(name, text));
        }

        info!(job_id = %job_id, documents = documents.len(), "documents loaded");
        DocumentSet::new(documents)
    }

    async fn filename_mapping(&self, job_id: &JobId) -> Result<HashMap<String, String>> {
        let path = job_dir(&self.root, job_id).join(artifact_names::FILENAME_MAPPING);
        Ok(read_json(&path).await?.unwrap_or_default())
    }

    async fn find_elsewhere(&self, job_id: &JobId, name: &str) -> Result<Option<Document>> {
        if !is_plain_file_name(name) {
            return Ok(None);
        }

        let mut siblings = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(root = %self.root.display(), error = %e, "uploads listing cut short");
                    break;
                }
            };
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && entry.file_name() != job_id.as_str() {
                siblings.push(entry.path());
            }
        }
        siblings.sort();

        for dir in siblings {
            let path = dir.join(name);
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }
            let text = match fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        document = name,
                        path = %path.display(),
                        error = %e,
                        "unreadable sibling document skipped"
                    );
                    continue;
                }
            };
            debug!(
                job_id = %job_id,
                document = name,
                found_in = %dir.display(),
                "document found in sibling job"
            );
            return Ok(Some(Document::new(name, text)));
        }

        Ok(None)
    }
}
