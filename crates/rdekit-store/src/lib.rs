//! Durable artifacts: the analysis artifact, the unique contact ids side
//! file and the import result log. All writes are atomic.

pub mod artifact;
mod error;
pub mod fs;
pub mod import_log;

pub use artifact::{
    AnalysisArtifact, ContactIdsArtifact, FORMAT_VERSION, SourceInfo, default_analysis_path,
    default_contacts_path, default_import_log_path,
};
pub use error::StoreError;
pub use import_log::{
    Counters, FailureRecord, ImportLog, ImportResult, Outcome, StageReport, StageStatus,
};
