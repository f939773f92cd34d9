//! Extraction runner trait - "documents in, merged report out".
//!
//! Whether a run happens in-process or in a separate worker is a deployment
//! choice; callers only see this interface and a progress channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{document::DocumentSet, job::JobId, pass::PassKind, report::MergedReport};

/// Emitted after every completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassProgress {
    pub pass_number: u32,
    pub passes_needed: u32,
    pub pass_type: PassKind,

    /// Whether the pass produced a fallback result
    pub fallback: bool,
}

impl PassProgress {
    /// Completion percentage, `round(pass / passes_needed * 100)`.
    pub fn percent(&self) -> u8 {
        if self.passes_needed == 0 {
            return 100;
        }
        let pct = (self.pass_number as f64 / self.passes_needed as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

pub type ProgressSender = mpsc::UnboundedSender<PassProgress>;

/// Runs a full multi-pass extraction over a document set.
#[async_trait]
pub trait ExtractionRunner: Send + Sync {
    async fn run_extraction(
        &self,
        job_id: &JobId,
        documents: &DocumentSet,
        progress: Option<ProgressSender>,
    ) -> Result<MergedReport>;
}
