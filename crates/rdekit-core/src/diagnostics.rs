use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{DepositType, EntityKind};

/// A finding recorded during analysis. None of these abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    CountMismatch {
        kind: EntityKind,
        declared: u64,
        extracted: u64,
    },
    UnmappedRegistrar {
        source_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        claimed_by: Option<String>,
    },
    UnmappedRegistrarReference {
        kind: EntityKind,
        key: String,
        registrar: String,
    },
    ValidationFailure {
        kind: EntityKind,
        key: String,
        error: String,
    },
    MissingContact {
        contact_id: String,
        referenced_by: Vec<String>,
    },
    MissingHost {
        host_name: String,
        referenced_by: Vec<String>,
    },
    DuplicatedHost {
        name: String,
        sponsors: Vec<String>,
    },
    DuplicateRecord {
        kind: EntityKind,
        key: String,
    },
    UnsupportedDepositType {
        deposit_type: DepositType,
    },
    UnknownElement {
        name: String,
        occurrences: usize,
    },
}

impl Diagnostic {
    /// Tag used when grouping diagnostics for display.
    pub fn type_name(&self) -> &'static str {
        match self {
            Diagnostic::CountMismatch { .. } => "count_mismatch",
            Diagnostic::UnmappedRegistrar { .. } => "unmapped_registrar",
            Diagnostic::UnmappedRegistrarReference { .. } => "unmapped_registrar_reference",
            Diagnostic::ValidationFailure { .. } => "validation_failure",
            Diagnostic::MissingContact { .. } => "missing_contact",
            Diagnostic::MissingHost { .. } => "missing_host",
            Diagnostic::DuplicatedHost { .. } => "duplicated_host",
            Diagnostic::DuplicateRecord { .. } => "duplicate_record",
            Diagnostic::UnsupportedDepositType { .. } => "unsupported_deposit_type",
            Diagnostic::UnknownElement { .. } => "unknown_element",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CountMismatch {
                kind,
                declared,
                extracted,
            } => write!(f, "{kind}: header declares {declared}, deposit contains {extracted}"),
            Diagnostic::UnmappedRegistrar {
                source_id,
                name,
                claimed_by,
            } => {
                write!(f, "registrar {source_id}")?;
                if let Some(name) = name {
                    write!(f, " ({name})")?;
                }
                match claimed_by {
                    Some(other) => write!(f, " resolves to the same target as {other}; needs an override"),
                    None => write!(f, " has no target mapping"),
                }
            }
            Diagnostic::UnmappedRegistrarReference {
                kind,
                key,
                registrar,
            } => write!(f, "{kind} {key} references unmapped registrar {registrar}"),
            Diagnostic::ValidationFailure { kind, key, error } => {
                write!(f, "{kind} {key}: {error}")
            }
            Diagnostic::MissingContact {
                contact_id,
                referenced_by,
            } => write!(
                f,
                "contact {contact_id} missing, referenced by {}",
                referenced_by.join(", ")
            ),
            Diagnostic::MissingHost {
                host_name,
                referenced_by,
            } => write!(
                f,
                "host {host_name} missing, referenced by {}",
                referenced_by.join(", ")
            ),
            Diagnostic::DuplicatedHost { name, sponsors } => {
                write!(f, "host {name} duplicated for sponsors {}", sponsors.join(", "))
            }
            Diagnostic::DuplicateRecord { kind, key } => {
                write!(f, "{kind} {key} appears more than once; kept the first")
            }
            Diagnostic::UnsupportedDepositType { deposit_type } => {
                write!(f, "{deposit_type} deposit: only FULL deposits are analysed completely")
            }
            Diagnostic::UnknownElement { name, occurrences } => {
                write!(f, "unknown element <{name}> skipped {occurrences} time(s)")
            }
        }
    }
}
