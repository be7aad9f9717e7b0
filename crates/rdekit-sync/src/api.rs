//! The target registry as the import orchestrator sees it.

use async_trait::async_trait;
use rdekit_core::{Command, TargetRegistrar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TldInfo {
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// Operations the import needs from the target registry.
///
/// `submit` reports an object that is already present as
/// [`ApiError::AlreadyExists`]; the orchestrator decides what that means.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn tld(&self, name: &str) -> Result<TldInfo, ApiError>;

    async fn list_registrars(&self) -> Result<Vec<TargetRegistrar>, ApiError>;

    async fn registrar(&self, client_id: &str) -> Result<(), ApiError>;

    async fn submit(&self, command: &Command) -> Result<(), ApiError>;
}
