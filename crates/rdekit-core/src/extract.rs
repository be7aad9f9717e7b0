//! Raw record → create-command extraction, one extractor per entity kind.
//!
//! Extraction never aborts on a bad record: each extractor yields the
//! commands that validated and a list of per-record failures.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::command::{
    ContactCommand, ContactRole, DomainCommand, DomainContact, HostCommand, NameState,
    NndnCommand, PostalInfo, PostalKind,
};
use crate::config::IdMode;
use crate::model::EntityKind;
use crate::raw::{RawContact, RawDomain, RawHost, RawNndn, RawPostalInfo};
use crate::validate::{self, ValidationError, require};

/// Shared contract of the per-kind extractors.
pub trait Extractor {
    type Raw;
    type Command;

    const KIND: EntityKind;

    /// Identifies a raw record in diagnostics, even when it fails validation.
    fn record_key(raw: &Self::Raw) -> String;

    /// Identity used to drop repeated records.
    fn command_key(command: &Self::Command) -> String;

    fn extract(&self, raw: &Self::Raw) -> Result<Self::Command, ValidationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub kind: EntityKind,
    pub key: String,
    pub error: ValidationError,
}

#[derive(Debug, Clone)]
pub struct Extraction<C> {
    pub commands: Vec<C>,
    pub failures: Vec<RecordFailure>,
    /// Keys of repeated records; the first occurrence wins.
    pub duplicates: Vec<String>,
}

impl<C> Default for Extraction<C> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            failures: Vec::new(),
            duplicates: Vec::new(),
        }
    }
}

/// Run `extractor` over every raw record.
pub fn extract_all<E: Extractor>(extractor: &E, raws: &[E::Raw]) -> Extraction<E::Command> {
    let mut out = Extraction::default();
    let mut seen = BTreeSet::new();

    for raw in raws {
        match extractor.extract(raw) {
            Ok(command) => {
                let key = E::command_key(&command);
                if seen.insert(key.clone()) {
                    out.commands.push(command);
                } else {
                    debug!(kind = %E::KIND, key = %key, "dropping repeated record");
                    out.duplicates.push(key);
                }
            }
            Err(error) => {
                let key = E::record_key(raw);
                debug!(kind = %E::KIND, key = %key, error = %error, "record failed validation");
                out.failures.push(RecordFailure {
                    kind: E::KIND,
                    key,
                    error,
                });
            }
        }
    }

    info!(
        kind = %E::KIND,
        extracted = out.commands.len(),
        failed = out.failures.len(),
        "extraction complete"
    );
    out
}

fn resource_id(mode: IdMode, roid: Option<&str>) -> Result<Option<String>, ValidationError> {
    match mode {
        IdMode::Generate => Ok(None),
        IdMode::Preserve => {
            let roid = require("roid", roid)?;
            validate::roid(&roid)?;
            Ok(Some(roid))
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ── Contacts ──

#[derive(Debug, Clone, Default)]
pub struct ContactExtractor {
    pub id_mode: IdMode,
}

fn postal_info(raw: &RawPostalInfo) -> Result<PostalInfo, ValidationError> {
    let kind = match raw.kind.as_deref().map(str::trim) {
        None | Some("int") => PostalKind::Int,
        Some("loc") => PostalKind::Loc,
        Some(other) => return Err(ValidationError::InvalidPostalType(other.to_string())),
    };
    Ok(PostalInfo {
        kind,
        name: require("postalInfo/name", raw.name.as_deref())?,
        org: non_empty(&raw.org),
        street: raw.street.clone(),
        city: require("postalInfo/addr/city", raw.city.as_deref())?,
        sp: non_empty(&raw.sp),
        pc: non_empty(&raw.pc),
        cc: validate::country_code(&require("postalInfo/addr/cc", raw.cc.as_deref())?)?,
    })
}

impl Extractor for ContactExtractor {
    type Raw = RawContact;
    type Command = ContactCommand;

    const KIND: EntityKind = EntityKind::Contact;

    fn record_key(raw: &RawContact) -> String {
        raw.id.clone()
    }

    fn command_key(command: &ContactCommand) -> String {
        command.id.clone()
    }

    fn extract(&self, raw: &RawContact) -> Result<ContactCommand, ValidationError> {
        let id = require("id", Some(raw.id.as_str()))?;
        validate::contact_id(&id)?;

        if raw.postal_info.is_empty() {
            return Err(ValidationError::MissingField("postalInfo"));
        }
        let postal_info = raw
            .postal_info
            .iter()
            .map(postal_info)
            .collect::<Result<Vec<_>, _>>()?;

        let email = require("email", raw.email.as_deref())?;
        validate::email(&email)?;

        Ok(ContactCommand {
            id,
            resource_id: resource_id(self.id_mode, raw.roid.as_deref())?,
            statuses: validate::statuses(EntityKind::Contact, &raw.statuses)?,
            postal_info,
            voice: non_empty(&raw.voice),
            fax: non_empty(&raw.fax),
            email,
            sponsor: require("clID", raw.cl_id.as_deref())?,
            creator: non_empty(&raw.cr_rr),
            created_at: validate::timestamp("crDate", raw.cr_date.as_deref())?,
            updater: non_empty(&raw.up_rr),
            updated_at: validate::timestamp("upDate", raw.up_date.as_deref())?,
        })
    }
}

// ── Hosts ──

#[derive(Debug, Clone, Default)]
pub struct HostExtractor {
    pub id_mode: IdMode,
}

impl Extractor for HostExtractor {
    type Raw = RawHost;
    type Command = HostCommand;

    const KIND: EntityKind = EntityKind::Host;

    fn record_key(raw: &RawHost) -> String {
        raw.name.to_ascii_lowercase()
    }

    fn command_key(command: &HostCommand) -> String {
        command.name.clone()
    }

    fn extract(&self, raw: &RawHost) -> Result<HostCommand, ValidationError> {
        let name = validate::host_name(&require("name", Some(raw.name.as_str()))?)?;
        let addresses = raw
            .addrs
            .iter()
            .map(|a| validate::address(a.ip.as_deref(), &a.value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HostCommand {
            name,
            resource_id: resource_id(self.id_mode, raw.roid.as_deref())?,
            statuses: validate::statuses(EntityKind::Host, &raw.statuses)?,
            addresses,
            sponsor: require("clID", raw.cl_id.as_deref())?,
            creator: non_empty(&raw.cr_rr),
            created_at: validate::timestamp("crDate", raw.cr_date.as_deref())?,
            updater: non_empty(&raw.up_rr),
            updated_at: validate::timestamp("upDate", raw.up_date.as_deref())?,
            duplicate_of: None,
        })
    }
}

// ── Domains ──

#[derive(Debug, Clone)]
pub struct DomainExtractor {
    pub tld: String,
    pub id_mode: IdMode,
}

impl Extractor for DomainExtractor {
    type Raw = RawDomain;
    type Command = DomainCommand;

    const KIND: EntityKind = EntityKind::Domain;

    fn record_key(raw: &RawDomain) -> String {
        raw.name.to_ascii_lowercase()
    }

    fn command_key(command: &DomainCommand) -> String {
        command.name.clone()
    }

    fn extract(&self, raw: &RawDomain) -> Result<DomainCommand, ValidationError> {
        let name = validate::domain_name(&require("name", Some(raw.name.as_str()))?, &self.tld)?;

        let registrant = non_empty(&raw.registrant);
        if let Some(id) = &registrant {
            validate::contact_id(id)?;
        }

        let mut contacts = Vec::with_capacity(raw.contacts.len());
        for c in &raw.contacts {
            let kind = c.kind.as_deref().unwrap_or_default();
            let role = ContactRole::parse(kind)
                .ok_or_else(|| ValidationError::InvalidContactRole(kind.to_string()))?;
            validate::contact_id(&c.id)?;
            contacts.push(DomainContact {
                role,
                id: c.id.clone(),
            });
        }

        let mut nameservers: Vec<String> = Vec::with_capacity(raw.nameservers.len());
        for ns in &raw.nameservers {
            let ns = validate::host_name(ns)?;
            if !nameservers.contains(&ns) {
                nameservers.push(ns);
            }
        }

        Ok(DomainCommand {
            name,
            resource_id: resource_id(self.id_mode, raw.roid.as_deref())?,
            u_name: non_empty(&raw.u_name),
            idn_table: non_empty(&raw.idn_table_id),
            statuses: validate::statuses(EntityKind::Domain, &raw.statuses)?,
            registrant,
            contacts,
            nameservers,
            host_links: Vec::new(),
            sponsor: require("clID", raw.cl_id.as_deref())?,
            creator: non_empty(&raw.cr_rr),
            created_at: validate::timestamp("crDate", raw.cr_date.as_deref())?,
            expires_at: validate::timestamp("exDate", raw.ex_date.as_deref())?,
            updater: non_empty(&raw.up_rr),
            updated_at: validate::timestamp("upDate", raw.up_date.as_deref())?,
        })
    }
}

// ── NNDN ──

#[derive(Debug, Clone)]
pub struct NndnExtractor {
    pub tld: String,
}

impl Extractor for NndnExtractor {
    type Raw = RawNndn;
    type Command = NndnCommand;

    const KIND: EntityKind = EntityKind::Nndn;

    fn record_key(raw: &RawNndn) -> String {
        raw.a_name.to_ascii_lowercase()
    }

    fn command_key(command: &NndnCommand) -> String {
        command.name.clone()
    }

    fn extract(&self, raw: &RawNndn) -> Result<NndnCommand, ValidationError> {
        let name = validate::domain_name(&require("aName", Some(raw.a_name.as_str()))?, &self.tld)?;
        let state_raw = require("nameState", raw.name_state.as_deref())?;
        let state = NameState::parse(&state_raw)
            .ok_or(ValidationError::UnknownNameState(state_raw))?;

        Ok(NndnCommand {
            name,
            u_name: non_empty(&raw.u_name),
            idn_table: non_empty(&raw.idn_table_id),
            state,
            created_at: validate::timestamp("crDate", raw.cr_date.as_deref())?,
        })
    }
}
