//! Extraction service implementations and structured-output helpers.
//!
//! `strict_schema` is always available; the OpenAI-compatible client is
//! behind the `openai` feature. Users can implement `ExtractionService`
//! for any other provider.

pub mod schema;

#[cfg(feature = "openai")]
mod openai;

pub use schema::strict_schema;

#[cfg(feature = "openai")]
pub use openai::OpenAI;
