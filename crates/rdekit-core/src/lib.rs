pub mod analysis;
pub mod chunk;
pub mod command;
pub mod config;
pub mod deposit;
pub mod diagnostics;
pub mod extract;
pub mod hosts;
pub mod model;
pub mod raw;
pub mod registrar;
pub mod status;
pub mod validate;
mod xml;
pub mod xref;

pub use analysis::{AnalysisResult, UnmappedReference, analyze};
pub use chunk::{Chunks, chunk_size};
pub use command::{Command, HostKey, References};
pub use config::{AnalyzeConfig, ApiConfig, IdMode, ImportConfig};
pub use deposit::{Deposit, ParseError, parse_deposit_file, parse_header_only_file};
pub use diagnostics::Diagnostic;
pub use model::{DepositHeader, DepositType, EntityCounts, EntityKind};
pub use registrar::{MappingError, RegistrarIdMap, RegistrarOverrides, TargetRegistrar};
pub use validate::ValidationError;
