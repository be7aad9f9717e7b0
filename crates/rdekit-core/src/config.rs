//! Explicit run configuration. Built once by the binary and passed down;
//! nothing below the CLI reads the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Whether source resource identifiers (ROIDs) are carried into commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    /// Keep source ROIDs: importing back into a peer of the source system.
    Preserve,
    /// Drop source ROIDs; the target assigns fresh ones.
    #[default]
    Generate,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzeConfig {
    pub id_mode: IdMode,
}

#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Chunks in flight at once.
    pub workers: usize,
    /// Commands per chunk.
    pub chunk_size: usize,
    /// Skip commands with unmapped registrars instead of refusing to start.
    pub tolerate_unmapped: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            chunk_size: 50,
            tolerate_unmapped: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Delay before retry `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}
