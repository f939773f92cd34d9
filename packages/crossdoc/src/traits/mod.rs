//! Core trait abstractions for the crossdoc library.
//!
//! These traits define the interfaces that applications implement
//! to provide the LLM service, storage, and document loading.

pub mod ai;
pub mod runner;
pub mod store;
