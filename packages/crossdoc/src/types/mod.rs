//! Data types for documents, findings, passes, reports, anchors, and jobs.

pub mod anchor;
pub mod config;
pub mod document;
pub mod finding;
pub mod job;
pub mod pass;
pub mod report;
