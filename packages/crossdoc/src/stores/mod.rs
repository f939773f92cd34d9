//! Storage implementations for the crossdoc library.
//!
//! Available backends:
//! - `MemoryJobStore` / `MemoryArtifactStore` - in-memory (always available)
//! - `FsArtifactStore` / `FsDocumentSource` - job directories under an uploads root

pub mod fs;
pub mod memory;

pub use fs::{FsArtifactStore, FsDocumentSource};
pub use memory::{MemoryArtifactStore, MemoryJobStore};
