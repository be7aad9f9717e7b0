//! The analysis phase: deposit in, [`AnalysisResult`] out.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::command::{ContactCommand, DomainCommand, HostCommand, NndnCommand, References};
use crate::config::{AnalyzeConfig, IdMode};
use crate::deposit::Deposit;
use crate::diagnostics::Diagnostic;
use crate::extract::{
    ContactExtractor, DomainExtractor, Extraction, HostExtractor, NndnExtractor, extract_all,
};
use crate::hosts::resolve_host_sponsorship;
use crate::model::{DepositHeader, DepositType, EntityCounts, EntityKind};
use crate::registrar::{MappingError, RegistrarIdMap, RegistrarOverrides, TargetRegistrar, map_registrars};
use crate::xref;

/// Everything the import phase needs, persisted between the two phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub header: DepositHeader,
    /// Records found in the deposit, valid or not.
    #[serde(default)]
    pub deposit_counts: EntityCounts,
    pub id_mode: IdMode,
    pub registrar_map: RegistrarIdMap,
    pub contacts: Vec<ContactCommand>,
    pub hosts: Vec<HostCommand>,
    pub domains: Vec<DomainCommand>,
    pub nndns: Vec<NndnCommand>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A command whose registrar the map cannot resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedReference {
    pub kind: EntityKind,
    pub key: String,
    pub registrar: String,
}

impl AnalysisResult {
    /// Commands ready for import. Hosts count once per sponsor copy and
    /// registrars once per mapping, so these differ from the deposit counts
    /// even on a consistent deposit.
    pub fn command_counts(&self) -> EntityCounts {
        EntityCounts {
            registrars: self.registrar_map.len() as u64,
            idn_tables: 0,
            contacts: self.contacts.len() as u64,
            hosts: self.hosts.len() as u64,
            domains: self.domains.len() as u64,
            nndns: self.nndns.len() as u64,
        }
    }

    pub fn referenced_contact_ids(&self) -> BTreeSet<String> {
        xref::referenced_contact_ids(&self.hosts, &self.domains)
    }

    /// Registrar references `map` cannot resolve, in stage order.
    pub fn unmapped_references(&self, map: &RegistrarIdMap) -> Vec<UnmappedReference> {
        let mut out = Vec::new();
        let mut scan = |kind: EntityKind, key: String, ids: Vec<&str>| {
            let mut seen = BTreeSet::new();
            for id in ids {
                if !map.contains(id) && seen.insert(id) {
                    out.push(UnmappedReference {
                        kind,
                        key: key.clone(),
                        registrar: id.to_string(),
                    });
                }
            }
        };
        for c in &self.contacts {
            scan(EntityKind::Contact, c.id.clone(), c.registrar_ids());
        }
        for h in &self.hosts {
            scan(EntityKind::Host, h.key().to_string(), h.registrar_ids());
        }
        for d in &self.domains {
            scan(EntityKind::Domain, d.name.clone(), d.registrar_ids());
        }
        out
    }

    pub fn diagnostics_of(&self, type_name: &str) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.type_name() == type_name)
    }
}

fn record<C>(kind: EntityKind, extraction: &Extraction<C>, diagnostics: &mut Vec<Diagnostic>) {
    for failure in &extraction.failures {
        diagnostics.push(Diagnostic::ValidationFailure {
            kind,
            key: failure.key.clone(),
            error: failure.error.to_string(),
        });
    }
    for key in &extraction.duplicates {
        diagnostics.push(Diagnostic::DuplicateRecord {
            kind,
            key: key.clone(),
        });
    }
}

/// Run the full analysis over a parsed deposit.
///
/// `directory` is the target system's registrar list (empty when no target
/// is reachable); `overrides` are layered on top of it. Only an ambiguous
/// registrar mapping fails the analysis; everything else is a diagnostic.
pub fn analyze(
    deposit: &Deposit,
    directory: &[TargetRegistrar],
    overrides: Option<&RegistrarOverrides>,
    config: &AnalyzeConfig,
) -> Result<AnalysisResult, MappingError> {
    let header = deposit.header.clone();
    let deposit_counts = deposit.record_counts();
    let mut diagnostics = Vec::new();

    if let Some(deposit_type) = header.deposit_type
        && deposit_type != DepositType::Full
    {
        warn!(%deposit_type, "deposit is not a full deposit");
        diagnostics.push(Diagnostic::UnsupportedDepositType { deposit_type });
    }

    for (name, occurrences) in &deposit.unknown_elements {
        diagnostics.push(Diagnostic::UnknownElement {
            name: name.clone(),
            occurrences: *occurrences,
        });
    }

    for (kind, declared, extracted) in header.counts.mismatches(&deposit_counts) {
        warn!(%kind, declared, extracted, "header count mismatch");
        diagnostics.push(Diagnostic::CountMismatch {
            kind,
            declared,
            extracted,
        });
    }

    let mapping = map_registrars(&deposit.registrars, directory, overrides)?;
    for u in &mapping.unmapped {
        diagnostics.push(Diagnostic::UnmappedRegistrar {
            source_id: u.source_id.clone(),
            name: u.name.clone(),
            claimed_by: u.claimed_by.clone(),
        });
    }

    // Contacts, hosts, domains, NNDN: later kinds refer to earlier ones.
    let contacts = extract_all(&ContactExtractor { id_mode: config.id_mode }, &deposit.contacts);
    record(EntityKind::Contact, &contacts, &mut diagnostics);

    let hosts = extract_all(&HostExtractor { id_mode: config.id_mode }, &deposit.hosts);
    record(EntityKind::Host, &hosts, &mut diagnostics);

    let domain_extractor = DomainExtractor {
        tld: header.tld.clone(),
        id_mode: config.id_mode,
    };
    let domains = extract_all(&domain_extractor, &deposit.domains);
    record(EntityKind::Domain, &domains, &mut diagnostics);

    let nndn_extractor = NndnExtractor {
        tld: header.tld.clone(),
    };
    let nndns = extract_all(&nndn_extractor, &deposit.nndns);
    record(EntityKind::Nndn, &nndns, &mut diagnostics);

    for missing in xref::check_contacts(&contacts.commands, &hosts.commands, &domains.commands) {
        diagnostics.push(Diagnostic::MissingContact {
            contact_id: missing.contact_id,
            referenced_by: missing.referenced_by,
        });
    }
    for missing in xref::missing_hosts(&hosts.commands, &domains.commands) {
        diagnostics.push(Diagnostic::MissingHost {
            host_name: missing.host_name,
            referenced_by: missing.referenced_by,
        });
    }

    let resolution = resolve_host_sponsorship(&hosts.commands, &domains.commands);
    for dup in resolution.duplicated {
        diagnostics.push(Diagnostic::DuplicatedHost {
            name: dup.name,
            sponsors: dup.sponsors,
        });
    }

    let mut result = AnalysisResult {
        header,
        deposit_counts,
        id_mode: config.id_mode,
        registrar_map: mapping.map,
        contacts: contacts.commands,
        hosts: resolution.hosts,
        domains: resolution.domains,
        nndns: nndns.commands,
        diagnostics,
    };

    for r in result.unmapped_references(&result.registrar_map) {
        result.diagnostics.push(Diagnostic::UnmappedRegistrarReference {
            kind: r.kind,
            key: r.key,
            registrar: r.registrar,
        });
    }

    info!(
        tld = %result.header.tld,
        contacts = result.contacts.len(),
        hosts = result.hosts.len(),
        domains = result.domains.len(),
        nndns = result.nndns.len(),
        diagnostics = result.diagnostics.len(),
        "analysis complete"
    );
    Ok(result)
}
