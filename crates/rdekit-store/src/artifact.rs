//! Versioned on-disk artifacts produced by `analyze` and consumed by `import`.
//!
//! Layout (JSON):
//!
//! ```text
//! <deposit>.analysis.json  { format_version, source, created_at, result }
//! <deposit>.contacts.json  { format_version, source, contact_ids }
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rdekit_core::{AnalysisResult, DepositHeader};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::StoreError;
use crate::fs::{read_json, write_json_atomic};

pub const FORMAT_VERSION: u32 = 1;

/// Identifies the deposit an artifact was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub file_name: String,
    pub size_bytes: u64,
}

impl SourceInfo {
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let meta = std::fs::metadata(path).map_err(|e| StoreError::io(path, e))?;
        Ok(SourceInfo {
            file_name: file_name(path),
            size_bytes: meta.len(),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<deposit>.<suffix>` next to the deposit file.
pub fn sibling_path(deposit: &Path, suffix: &str) -> PathBuf {
    let mut name = deposit.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

pub fn default_analysis_path(deposit: &Path) -> PathBuf {
    sibling_path(deposit, "analysis.json")
}

pub fn default_contacts_path(deposit: &Path) -> PathBuf {
    sibling_path(deposit, "contacts.json")
}

pub fn default_import_log_path(deposit: &Path) -> PathBuf {
    sibling_path(deposit, "import.json")
}

fn check_version(path: &Path, found: u32) -> Result<(), StoreError> {
    if found != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found,
            expected: FORMAT_VERSION,
        });
    }
    Ok(())
}

// ── Analysis artifact ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisArtifact {
    pub format_version: u32,
    pub source: SourceInfo,
    pub created_at: DateTime<Utc>,
    pub result: AnalysisResult,
}

impl AnalysisArtifact {
    pub fn new(source: SourceInfo, result: AnalysisResult) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            source,
            created_at: Utc::now(),
            result,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, self)?;
        info!(path = %path.display(), "wrote analysis artifact");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let artifact: AnalysisArtifact = read_json(path)?;
        check_version(path, artifact.format_version)?;
        Ok(artifact)
    }

    /// Refuse to import against a deposit other than the analysed one.
    pub fn verify_source(&self, deposit: &Path, header: &DepositHeader) -> Result<(), StoreError> {
        let name = file_name(deposit);
        if name != self.source.file_name {
            return Err(StoreError::SourceMismatch {
                artifact: self.source.file_name.clone(),
                deposit: name,
            });
        }
        let ours = &self.result.header;
        if ours != header {
            let detail = if ours.tld != header.tld {
                format!("tld {} vs {}", ours.tld, header.tld)
            } else if ours.counts != header.counts {
                "declared counts differ".to_string()
            } else {
                "deposit id, type or watermark differ".to_string()
            };
            return Err(StoreError::HeaderMismatch(detail));
        }
        Ok(())
    }
}

// ── Contact ids artifact ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactIdsArtifact {
    pub format_version: u32,
    pub source: SourceInfo,
    /// Sorted, distinct.
    pub contact_ids: Vec<String>,
}

impl ContactIdsArtifact {
    pub fn new(source: SourceInfo, ids: BTreeSet<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            source,
            contact_ids: ids.into_iter().collect(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, self)?;
        info!(path = %path.display(), count = self.contact_ids.len(), "wrote contact ids");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let artifact: ContactIdsArtifact = read_json(path)?;
        check_version(path, artifact.format_version)?;
        Ok(artifact)
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.contact_ids.iter().cloned().collect()
    }
}
