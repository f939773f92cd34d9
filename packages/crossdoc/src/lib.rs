//! Cross-Document Theme and Contradiction Extraction Library
//!
//! Runs a multi-pass LLM analysis over a fixed set of documents, merges
//! what every pass found into one de-duplicated report, and places each
//! finding's cited phrases back into the document text as highlightable
//! spans.
//!
//! # Design Philosophy
//!
//! - Passes are sequential: each prompt carries what earlier passes found
//! - A bad answer from the model degrades one pass, never the whole run
//! - Every model response is parsed into typed structs, never poked at as
//!   free-form JSON
//! - Anchors are best-effort: a phrase that cannot be placed is simply
//!   not highlighted
//!
//! # Usage
//!
//! ```rust,ignore
//! use crossdoc::{Pipeline, PipelineConfig, DocumentSet, Document, JobId};
//! use crossdoc::stores::MemoryArtifactStore;
//! use crossdoc::testing::MockExtractionService;
//!
//! let documents = DocumentSet::new(vec![
//!     Document::new("a.md", "The system uses a retry queue for failures."),
//!     Document::new("b.md", "Failures are dropped without any retry."),
//! ])?;
//!
//! let pipeline = Pipeline::new(
//!     MockExtractionService::new(),
//!     MemoryArtifactStore::new(),
//!     PipelineConfig::default(),
//! );
//! let output = pipeline.run(&JobId::generate(), &documents, None).await?;
//!
//! for doc in documents.iter() {
//!     let anchors = crossdoc::anchor::resolve_document(doc, &output.report);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams: extraction service, job/artifact stores, document source
//! - [`types`] - Documents, findings, pass results, reports, anchors, jobs
//! - [`pipeline`] - Planning, prompts, pass execution, merging, orchestration
//! - [`anchor`] - Text anchor resolution and match scoring
//! - [`stores`] - In-memory and filesystem storage
//! - [`jobs`] - Background job runner and status queries
//! - [`ai`] - Strict schemas and the OpenAI-compatible client
//! - [`testing`] - Mock extraction service for tests

pub mod ai;
pub mod anchor;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{CrossdocError, Result};
pub use traits::{
    ai::{ExtractionService, ServiceRequest},
    runner::{ExtractionRunner, PassProgress, ProgressSender},
    store::{artifact_names, ArtifactStore, DocumentSource, JobStore},
};
pub use types::{
    anchor::{AnchorSpan, DocumentAnchors, Span},
    config::{JobStoreConfig, PipelineConfig},
    document::{Document, DocumentSet},
    finding::{Contradiction, FindingKind, FindingRef, Instance, Severity, TargetRef, Theme},
    job::{JobFile, JobId, JobResults, JobStatus},
    pass::{ConceptCount, ExtractionParams, PassKind, PassMetadata, PassResult},
    report::{MergedReport, SummaryReport},
};

// Re-export pipeline components
pub use pipeline::{
    build_summary, PassExecutor, PassOutcome, PassPlanner, Pipeline, ResultMerger, RunOutput,
};

// Re-export anchor entry points
pub use anchor::{match_quality, resolve_all, resolve_anchor, resolve_document};

// Re-export stores and the job runner
pub use jobs::JobRunner;
pub use stores::{FsArtifactStore, FsDocumentSource, MemoryArtifactStore, MemoryJobStore};

#[cfg(feature = "openai")]
pub use ai::OpenAI;

// Re-export testing utilities
pub use testing::{MockExtractionService, MockPassResponse};
