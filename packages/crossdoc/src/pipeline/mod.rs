//! Multi-pass extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Planning (pass count and per-pass item targets)
//! - Prompt construction from the documents and earlier passes
//! - Pass execution with validation and fallback
//! - Merging and deduplication across passes
//! - Summary and artifact output

pub mod execute;
pub mod merge;
pub mod plan;
pub mod prompts;
pub mod run;
pub mod summary;

pub use execute::{
    fallback_result, parse_pass_response, response_schema, transform_pass_response,
    AIPassResponse, FallbackReason, PassExecutor, PassOutcome,
};
pub use merge::{dedupe, rank_file_connections, ResultMerger};
pub use plan::{pass_focus, PassPlanner, PASS_CATALOG};
pub use prompts::{build_pass_prompt, build_system_instruction, PASS_PROMPT, SYSTEM_PROMPT};
pub use run::{should_stop, Pipeline, RunOutput, INTER_PASS_DELAY};
pub use summary::build_summary;
