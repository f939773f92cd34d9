//! Documents and the immutable document set of one analysis job.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{CrossdocError, Result};

/// A named text document.
///
/// Immutable once loaded. The name is the identity within a job and is
/// what findings cite as `source_file` / `target_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stored file name (unique within a job)
    pub name: String,

    /// Full document text
    pub text: String,
}

impl Document {
    /// Create a new document.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Length of the text in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// The fixed collection of documents for one analysis job.
///
/// Documents are shared behind `Arc` so resolvers running on other tasks
/// reference the job's text instead of copying it.
#[derive(Debug, Clone)]
pub struct DocumentSet {
    documents: Vec<Arc<Document>>,
}

impl DocumentSet {
    /// Build a document set, rejecting empty sets and duplicate names.
    pub fn new(documents: impl IntoIterator<Item = Document>) -> Result<Self> {
        let documents: Vec<Arc<Document>> = documents.into_iter().map(Arc::new).collect();
        if documents.is_empty() {
            return Err(CrossdocError::EmptyDocumentSet);
        }

        let mut seen = HashSet::new();
        for doc in &documents {
            if !seen.insert(doc.name.as_str()) {
                return Err(CrossdocError::DuplicateDocument {
                    name: doc.name.clone(),
                });
            }
        }

        Ok(Self { documents })
    }

    /// Number of documents (always at least 1).
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter().map(|d| d.as_ref())
    }

    /// Shared handles, for fanning work out across tasks.
    pub fn shared(&self) -> &[Arc<Document>] {
        &self.documents
    }

    /// Look up a document by name.
    pub fn get(&self, name: &str) -> Option<&Document> {
        self.iter().find(|d| d.name == name)
    }

    /// Document names in load order.
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|d| d.name.as_str()).collect()
    }

    /// Sum of all document lengths in characters.
    pub fn total_chars(&self) -> usize {
        self.iter().map(Document::char_len).sum()
    }
}
