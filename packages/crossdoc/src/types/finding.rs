//! Findings - themes and contradictions with their supporting instances.
//!
//! Field names serialize the way the extraction service and the stored
//! artifacts spell them (`theme`, `source_file`, `target_files`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A citation of another document inside an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRef {
    /// Cited document name
    #[serde(rename = "target_file")]
    pub target_doc: String,

    /// Phrase quoted from the cited document
    pub target_phrase: String,

    /// Theme relationships: how similar the two phrases are (0-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,

    /// Contradictions: what kind of conflict this is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_type: Option<String>,
}

impl TargetRef {
    /// Create a target reference with no extra scoring.
    pub fn new(target_doc: impl Into<String>, target_phrase: impl Into<String>) -> Self {
        Self {
            target_doc: target_doc.into(),
            target_phrase: target_phrase.into(),
            similarity_score: None,
            conflict_type: None,
        }
    }
}

/// One concrete occurrence evidencing a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Document the source phrase was quoted from
    #[serde(rename = "source_file")]
    pub source_doc: String,

    /// Phrase quoted from the source document
    pub source_phrase: String,

    /// Zero or more citations in other documents
    #[serde(rename = "target_files", default)]
    pub target_refs: Vec<TargetRef>,

    /// Why these phrases are related
    pub explanation: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_after: Option<String>,
}

impl Instance {
    /// Create an instance with no targets.
    pub fn new(
        source_doc: impl Into<String>,
        source_phrase: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            source_doc: source_doc.into(),
            source_phrase: source_phrase.into(),
            target_refs: Vec::new(),
            explanation: explanation.into(),
            context_before: None,
            context_after: None,
        }
    }

    /// Add a target citation.
    pub fn with_target(mut self, target: TargetRef) -> Self {
        self.target_refs.push(target);
        self
    }

    /// Every document this instance touches: the source, then each target.
    ///
    /// A document cited twice is yielded twice.
    pub fn connected_documents(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.source_doc.as_str())
            .chain(self.target_refs.iter().map(|t| t.target_doc.as_str()))
    }
}

/// How severe a contradiction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// A cross-document commonality claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(rename = "theme")]
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_depth: Option<String>,

    pub instances: Vec<Instance>,
}

impl Theme {
    /// Create a theme with the given instances.
    pub fn new(label: impl Into<String>, instances: Vec<Instance>) -> Self {
        Self {
            label: label.into(),
            frequency_score: None,
            discovery_depth: None,
            instances,
        }
    }

    /// Identity key used for deduplication.
    pub fn key(&self) -> String {
        self.label.to_lowercase()
    }

    /// Borrow as a kind-erased finding.
    pub fn as_finding(&self) -> FindingRef<'_> {
        FindingRef {
            kind: FindingKind::Theme,
            label: &self.label,
            instances: &self.instances,
        }
    }
}

/// A cross-document conflict claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    pub instances: Vec<Instance>,
}

impl Contradiction {
    /// Create a contradiction with the given instances.
    pub fn new(description: impl Into<String>, instances: Vec<Instance>) -> Self {
        Self {
            description: description.into(),
            severity: None,
            instances,
        }
    }

    /// Identity key used for deduplication.
    pub fn key(&self) -> String {
        self.description.to_lowercase()
    }

    /// Borrow as a kind-erased finding.
    pub fn as_finding(&self) -> FindingRef<'_> {
        FindingRef {
            kind: FindingKind::Contradiction,
            label: &self.description,
            instances: &self.instances,
        }
    }
}

/// Which list a finding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Theme,
    Contradiction,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Theme => "theme",
            FindingKind::Contradiction => "contradiction",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A borrowed view over either kind of finding.
///
/// The anchor resolver only needs the kind, the label, and the instances.
#[derive(Debug, Clone, Copy)]
pub struct FindingRef<'a> {
    pub kind: FindingKind,
    pub label: &'a str,
    pub instances: &'a [Instance],
}

/// Shared shape for deduplication by case-insensitive identity key.
pub trait Keyed {
    fn key(&self) -> String;
    fn instance_count(&self) -> usize;
}

impl Keyed for Theme {
    fn key(&self) -> String {
        Theme::key(self)
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl Keyed for Contradiction {
    fn key(&self) -> String {
        Contradiction::key(self)
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_serializes_with_wire_names() {
        let instance = Instance::new("a.md", "retry queue for failures", "both retry")
            .with_target(TargetRef::new("b.md", "retries failed jobs"));

        let json = serde_json::to_value(&instance).unwrap();
        assert_eq!(json["source_file"], "a.md");
        assert_eq!(json["target_files"][0]["target_file"], "b.md");
        assert!(json.get("context_before").is_none());
    }

    #[test]
    fn test_connected_documents_counts_repeats() {
        let instance = Instance::new("a.md", "phrase", "why")
            .with_target(TargetRef::new("b.md", "x"))
            .with_target(TargetRef::new("b.md", "y"));

        let docs: Vec<&str> = instance.connected_documents().collect();
        assert_eq!(docs, vec!["a.md", "b.md", "b.md"]);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        assert_eq!(
            Theme::new("Microservices", vec![]).key(),
            Theme::new("microservices", vec![]).key()
        );
        assert_eq!(
            Contradiction::new("Retry LIMITS differ", vec![]).key(),
            "retry limits differ"
        );
    }

    #[test]
    fn test_severity_parses_lowercase() {
        let c: Contradiction = serde_json::from_str(
            r#"{"description": "d", "severity": "high", "instances": []}"#,
        )
        .unwrap();
        assert_eq!(c.severity, Some(Severity::High));
    }
}
