//! The import result log: rewritten after every stage and on every exit
//! path, so an interrupted import always leaves a usable record.

use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rdekit_core::Command;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::StoreError;
use crate::artifact::{FORMAT_VERSION, SourceInfo};
use crate::fs::{read_json, write_json_atomic};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub submitted: u64,
    pub created: u64,
    pub already_exists: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl Counters {
    /// Commands that ended up present in the target.
    pub fn committed(&self) -> u64 {
        self.created + self.already_exists
    }
}

impl AddAssign for Counters {
    fn add_assign(&mut self, other: Counters) {
        self.submitted += other.submitted;
        self.created += other.created;
        self.already_exists += other.already_exists;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Skipped,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub name: String,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counters: Counters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub stage: String,
    pub key: String,
    /// The command as it would have been submitted, when one was built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    pub error: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    Completed,
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub format_version: u32,
    pub source: SourceInfo,
    pub tld: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Outcome,
    pub stages: Vec<StageReport>,
    pub failures: Vec<FailureRecord>,
}

impl ImportResult {
    pub fn totals(&self) -> Counters {
        let mut total = Counters::default();
        for stage in &self.stages {
            total += stage.counters;
        }
        total
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }
}

/// An [`ImportResult`] bound to the file it is persisted to.
#[derive(Debug)]
pub struct ImportLog {
    path: PathBuf,
    result: ImportResult,
}

impl ImportLog {
    /// Start a new log and write it immediately.
    pub fn create(path: &Path, source: SourceInfo, tld: &str) -> Result<Self, StoreError> {
        let log = ImportLog {
            path: path.to_path_buf(),
            result: ImportResult {
                format_version: FORMAT_VERSION,
                source,
                tld: tld.to_string(),
                started_at: Utc::now(),
                finished_at: None,
                outcome: Outcome::InProgress,
                stages: Vec::new(),
                failures: Vec::new(),
            },
        };
        log.persist()?;
        info!(path = %path.display(), "import log started");
        Ok(log)
    }

    pub fn load(path: &Path) -> Result<ImportResult, StoreError> {
        read_json(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn result(&self) -> &ImportResult {
        &self.result
    }

    /// Buffer a failure; it is written with the next persisted stage.
    pub fn record_failure(&mut self, failure: FailureRecord) {
        self.result.failures.push(failure);
    }

    /// Append a finished stage and persist.
    pub fn record_stage(&mut self, report: StageReport) -> Result<(), StoreError> {
        debug!(stage = %report.name, status = ?report.status, "recording stage");
        self.result.stages.push(report);
        self.persist()
    }

    pub fn finish(&mut self) -> Result<(), StoreError> {
        self.close(Outcome::Completed)
    }

    pub fn abort(&mut self, reason: impl Into<String>) -> Result<(), StoreError> {
        self.close(Outcome::Aborted {
            reason: reason.into(),
        })
    }

    fn close(&mut self, outcome: Outcome) -> Result<(), StoreError> {
        self.result.outcome = outcome;
        self.result.finished_at = Some(Utc::now());
        self.persist()
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        write_json_atomic(&self.path, &self.result)
    }
}
