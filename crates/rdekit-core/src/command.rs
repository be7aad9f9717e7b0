//! Normalised, target-valid create-commands.
//!
//! Registrar fields hold *source* registrar ids until
//! [`Command::remap_registrars`] translates them immediately before submission.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registrar::{MappingError, RegistrarIdMap};
use crate::status::Status;

// ── Contacts ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostalKind {
    Int,
    Loc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalInfo {
    pub kind: PostalKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default)]
    pub street: Vec<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pc: Option<String>,
    pub cc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactCommand {
    pub id: String,
    /// Pre-assigned ROID; only set when importing back into the source system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub statuses: Vec<Status>,
    pub postal_info: Vec<PostalInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    pub email: String,
    pub sponsor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updater: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ── Hosts ──

/// Identity of a host object in the target: one sponsor per host, so the
/// same name may exist once per sponsor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostKey {
    pub name: String,
    pub sponsor: String,
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.sponsor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCommand {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default)]
    pub addresses: Vec<IpAddr>,
    pub sponsor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updater: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Sponsor of the origin host when this command is a sponsor copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
}

impl HostCommand {
    pub fn key(&self) -> HostKey {
        HostKey {
            name: self.name.clone(),
            sponsor: self.sponsor.clone(),
        }
    }
}

// ── Domains ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    Admin,
    Tech,
    Billing,
}

impl ContactRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "admin" => Some(ContactRole::Admin),
            "tech" => Some(ContactRole::Tech),
            "billing" => Some(ContactRole::Billing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainContact {
    pub role: ContactRole,
    pub id: String,
}

/// A domain's link to the host copy it delegates to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostLink {
    pub host_name: String,
    pub sponsor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCommand {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idn_table: Option<String>,
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registrant: Option<String>,
    #[serde(default)]
    pub contacts: Vec<DomainContact>,
    /// Host names as delegated in the deposit.
    #[serde(default)]
    pub nameservers: Vec<String>,
    /// Resolved links to sponsor-matched host copies; filled by the
    /// host sponsorship resolver.
    #[serde(default)]
    pub host_links: Vec<HostLink>,
    pub sponsor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updater: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DomainCommand {
    /// The create body: delegation is committed later, by the link stage.
    pub fn without_delegation(&self) -> DomainCommand {
        DomainCommand {
            nameservers: Vec::new(),
            host_links: Vec::new(),
            ..self.clone()
        }
    }
}

// ── NNDN ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameState {
    Blocked,
    Withheld,
    Mirrored,
}

impl NameState {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocked" => Some(NameState::Blocked),
            "withheld" => Some(NameState::Withheld),
            "mirrored" => Some(NameState::Mirrored),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NndnCommand {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idn_table: Option<String>,
    pub state: NameState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// ── Host linkage ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCommand {
    pub domain: String,
    pub host_name: String,
    pub sponsor: String,
}

// ── Tagged command ──

/// Any command the import orchestrator can submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "command", rename_all = "snake_case")]
pub enum Command {
    Contact(ContactCommand),
    Host(HostCommand),
    Domain(DomainCommand),
    Nndn(NndnCommand),
    LinkHost(LinkCommand),
}

impl Command {
    /// Stable key used in logs and result records.
    pub fn key(&self) -> String {
        match self {
            Command::Contact(c) => c.id.clone(),
            Command::Host(h) => h.key().to_string(),
            Command::Domain(d) => d.name.clone(),
            Command::Nndn(n) => n.name.clone(),
            Command::LinkHost(l) => format!("{} -> {}@{}", l.domain, l.host_name, l.sponsor),
        }
    }

    /// Translate every registrar id through `map`.
    ///
    /// Fails on the first registrar id the map cannot resolve.
    pub fn remap_registrars(&self, map: &RegistrarIdMap) -> Result<Command, MappingError> {
        let remap = |id: &str| map.lookup(id).map(str::to_string);
        let remap_opt = |id: &Option<String>| id.as_deref().map(remap).transpose();

        Ok(match self {
            Command::Contact(c) => Command::Contact(ContactCommand {
                sponsor: remap(&c.sponsor)?,
                creator: remap_opt(&c.creator)?,
                updater: remap_opt(&c.updater)?,
                ..c.clone()
            }),
            Command::Host(h) => Command::Host(HostCommand {
                sponsor: remap(&h.sponsor)?,
                creator: remap_opt(&h.creator)?,
                updater: remap_opt(&h.updater)?,
                duplicate_of: remap_opt(&h.duplicate_of)?,
                ..h.clone()
            }),
            Command::Domain(d) => Command::Domain(DomainCommand {
                sponsor: remap(&d.sponsor)?,
                creator: remap_opt(&d.creator)?,
                updater: remap_opt(&d.updater)?,
                host_links: d
                    .host_links
                    .iter()
                    .map(|l| -> Result<HostLink, MappingError> {
                        Ok(HostLink {
                            host_name: l.host_name.clone(),
                            sponsor: remap(&l.sponsor)?,
                        })
                    })
                    .collect::<Result<_, _>>()?,
                ..d.clone()
            }),
            Command::Nndn(n) => Command::Nndn(n.clone()),
            Command::LinkHost(l) => Command::LinkHost(LinkCommand {
                sponsor: remap(&l.sponsor)?,
                ..l.clone()
            }),
        })
    }
}

// ── Reference extraction ──

/// Identifiers a command refers to outside itself.
pub trait References {
    fn contact_ids(&self) -> Vec<&str> {
        Vec::new()
    }

    fn registrar_ids(&self) -> Vec<&str>;
}

fn push_opt<'a>(ids: &mut Vec<&'a str>, id: &'a Option<String>) {
    if let Some(id) = id.as_deref() {
        ids.push(id);
    }
}

impl References for ContactCommand {
    fn registrar_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.sponsor.as_str()];
        push_opt(&mut ids, &self.creator);
        push_opt(&mut ids, &self.updater);
        ids
    }
}

impl References for HostCommand {
    fn registrar_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.sponsor.as_str()];
        push_opt(&mut ids, &self.creator);
        push_opt(&mut ids, &self.updater);
        ids
    }
}

impl References for DomainCommand {
    fn contact_ids(&self) -> Vec<&str> {
        let mut ids = Vec::with_capacity(self.contacts.len() + 1);
        push_opt(&mut ids, &self.registrant);
        ids.extend(self.contacts.iter().map(|c| c.id.as_str()));
        ids
    }

    fn registrar_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.sponsor.as_str()];
        push_opt(&mut ids, &self.creator);
        push_opt(&mut ids, &self.updater);
        ids
    }
}

impl References for NndnCommand {
    fn registrar_ids(&self) -> Vec<&str> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> DomainCommand {
        DomainCommand {
            name: "example.tld".into(),
            resource_id: None,
            u_name: None,
            idn_table: None,
            statuses: vec![Status::Ok],
            registrant: Some("C-1".into()),
            contacts: vec![
                DomainContact {
                    role: ContactRole::Admin,
                    id: "C-2".into(),
                },
                DomainContact {
                    role: ContactRole::Tech,
                    id: "C-2".into(),
                },
            ],
            nameservers: vec!["ns1.example.tld".into()],
            host_links: vec![HostLink {
                host_name: "ns1.example.tld".into(),
                sponsor: "RAR-A".into(),
            }],
            sponsor: "RAR-A".into(),
            creator: Some("RAR-B".into()),
            created_at: None,
            expires_at: None,
            updater: None,
            updated_at: None,
        }
    }

    #[test]
    fn domain_references() {
        let d = domain();
        assert_eq!(d.contact_ids(), vec!["C-1", "C-2", "C-2"]);
        assert_eq!(d.registrar_ids(), vec!["RAR-A", "RAR-B"]);
    }

    #[test]
    fn remap_translates_every_registrar_field() {
        let mut map = RegistrarIdMap::new();
        map.insert("RAR-A", "target-a").unwrap();
        map.insert("RAR-B", "target-b").unwrap();

        let Command::Domain(d) = Command::Domain(domain()).remap_registrars(&map).unwrap() else {
            panic!("expected domain command");
        };
        assert_eq!(d.sponsor, "target-a");
        assert_eq!(d.creator.as_deref(), Some("target-b"));
        assert_eq!(d.host_links[0].sponsor, "target-a");
        assert_eq!(d.name, "example.tld");
    }

    #[test]
    fn remap_surfaces_unmapped_registrar() {
        let mut map = RegistrarIdMap::new();
        map.insert("RAR-A", "target-a").unwrap();
        let err = Command::Domain(domain()).remap_registrars(&map).unwrap_err();
        assert!(matches!(err, MappingError::Unmapped(id) if id == "RAR-B"));
    }

    #[test]
    fn tagged_command_json_shape() {
        let cmd = Command::Nndn(NndnCommand {
            name: "reserved.tld".into(),
            u_name: None,
            idn_table: None,
            state: NameState::Blocked,
            created_at: None,
        });
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["kind"], "nndn");
        assert_eq!(json["command"]["state"], "blocked");
        let parsed: Command = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn without_delegation_drops_hosts_only() {
        let d = domain().without_delegation();
        assert!(d.nameservers.is_empty());
        assert!(d.host_links.is_empty());
        assert_eq!(d.registrant.as_deref(), Some("C-1"));
    }
}
