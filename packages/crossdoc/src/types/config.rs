//! Configuration types for the pipeline and the job store.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a multi-pass extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model identifier sent to the extraction service.
    pub model: String,

    /// Upper bound on response tokens per pass.
    pub max_tokens: u32,

    /// Sampling temperature for pass 0; see `temperature_step`.
    ///
    /// Default: 0.3.
    pub base_temperature: f32,

    /// Added to the temperature once per pass number.
    ///
    /// Later passes sample slightly hotter to surface new material.
    /// Default: 0.05.
    pub temperature_step: f32,

    /// Abort the whole run when a pass fails at the transport level.
    ///
    /// When false (default), a failed pass becomes an empty fallback
    /// result and the loop advances.
    pub abort_on_service_failure: bool,

    /// Persist each pass result as its own artifact.
    ///
    /// Default: true.
    pub write_pass_artifacts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "qwen-3-32b".to_string(),
            max_tokens: 100_000,
            base_temperature: 0.3,
            temperature_step: 0.05,
            abort_on_service_failure: false,
            write_pass_artifacts: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Abort on transport failures instead of falling back.
    pub fn with_abort_on_service_failure(mut self, abort: bool) -> Self {
        self.abort_on_service_failure = abort;
        self
    }

    /// Enable or disable per-pass artifacts.
    pub fn with_pass_artifacts(mut self, enabled: bool) -> Self {
        self.write_pass_artifacts = enabled;
        self
    }

    /// Temperature for a given pass number.
    pub fn temperature_for(&self, pass_number: u32) -> f32 {
        self.base_temperature + pass_number as f32 * self.temperature_step
    }
}

/// Retention settings for the in-memory job registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobStoreConfig {
    /// Entries older than this (since completion, or start) are evicted.
    ///
    /// Default: 1 hour.
    pub result_ttl: Duration,

    /// How often the sweeper runs.
    ///
    /// Default: 10 minutes.
    pub sweep_interval: Duration,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self {
            result_ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_rises_per_pass() {
        let config = PipelineConfig::default();
        assert!((config.temperature_for(1) - 0.35).abs() < 1e-6);
        assert!((config.temperature_for(4) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::new()
            .with_model("gpt-4o")
            .with_abort_on_service_failure(true)
            .with_pass_artifacts(false);

        assert_eq!(config.model, "gpt-4o");
        assert!(config.abort_on_service_failure);
        assert!(!config.write_pass_artifacts);
    }

    #[test]
    fn test_store_defaults() {
        let config = JobStoreConfig::default();
        assert_eq!(config.result_ttl, Duration::from_secs(3600));
        assert_eq!(config.sweep_interval, Duration::from_secs(600));
    }
}
