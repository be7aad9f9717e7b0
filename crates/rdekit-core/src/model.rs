//! Deposit-level model: entity kinds, declared counts and the deposit header.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The record types an escrow deposit can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Registrar,
    IdnTable,
    Contact,
    Host,
    Domain,
    Nndn,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Registrar,
        EntityKind::IdnTable,
        EntityKind::Contact,
        EntityKind::Host,
        EntityKind::Domain,
        EntityKind::Nndn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Registrar => "registrar",
            EntityKind::IdnTable => "idn_table",
            EntityKind::Contact => "contact",
            EntityKind::Host => "host",
            EntityKind::Domain => "domain",
            EntityKind::Nndn => "nndn",
        }
    }

    /// Map a header `count` URI (e.g. `urn:ietf:params:xml:ns:rdeDomain-1.0`)
    /// to the kind it counts. Object types this pipeline does not carry
    /// (EPP parameters, policy) return `None`.
    pub fn from_count_uri(uri: &str) -> Option<Self> {
        let object = uri.rsplit(':').next()?;
        let object = object.split('-').next()?;
        match object {
            "rdeRegistrar" => Some(EntityKind::Registrar),
            "rdeIDNTableReference" | "rdeIDN" => Some(EntityKind::IdnTable),
            "rdeContact" => Some(EntityKind::Contact),
            "rdeHost" => Some(EntityKind::Host),
            "rdeDomain" => Some(EntityKind::Domain),
            "rdeNNDN" => Some(EntityKind::Nndn),
            _ => None,
        }
    }

    /// Map the local name of a record element under `<contents>`.
    pub fn from_element(local_name: &str) -> Option<Self> {
        match local_name {
            "registrar" => Some(EntityKind::Registrar),
            "idnTableRef" => Some(EntityKind::IdnTable),
            "contact" => Some(EntityKind::Contact),
            "host" => Some(EntityKind::Host),
            "domain" => Some(EntityKind::Domain),
            "NNDN" => Some(EntityKind::Nndn),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind record counts, either declared by a header or observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub registrars: u64,
    pub idn_tables: u64,
    pub contacts: u64,
    pub hosts: u64,
    pub domains: u64,
    pub nndns: u64,
}

impl EntityCounts {
    pub fn get(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Registrar => self.registrars,
            EntityKind::IdnTable => self.idn_tables,
            EntityKind::Contact => self.contacts,
            EntityKind::Host => self.hosts,
            EntityKind::Domain => self.domains,
            EntityKind::Nndn => self.nndns,
        }
    }

    fn slot(&mut self, kind: EntityKind) -> &mut u64 {
        match kind {
            EntityKind::Registrar => &mut self.registrars,
            EntityKind::IdnTable => &mut self.idn_tables,
            EntityKind::Contact => &mut self.contacts,
            EntityKind::Host => &mut self.hosts,
            EntityKind::Domain => &mut self.domains,
            EntityKind::Nndn => &mut self.nndns,
        }
    }

    pub fn set(&mut self, kind: EntityKind, value: u64) {
        *self.slot(kind) = value;
    }

    pub fn increment(&mut self, kind: EntityKind) {
        *self.slot(kind) += 1;
    }

    /// Kinds whose counts differ between `self` (declared) and `other` (observed).
    pub fn mismatches(&self, other: &EntityCounts) -> Vec<(EntityKind, u64, u64)> {
        EntityKind::ALL
            .into_iter()
            .filter(|&k| self.get(k) != other.get(k))
            .map(|k| (k, self.get(k), other.get(k)))
            .collect()
    }
}

/// Deposit type from the `type` attribute of the root `<deposit>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DepositType {
    Full,
    Incr,
    Diff,
}

impl DepositType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL" => Some(DepositType::Full),
            "INCR" => Some(DepositType::Incr),
            "DIFF" => Some(DepositType::Diff),
            _ => None,
        }
    }
}

impl fmt::Display for DepositType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DepositType::Full => "FULL",
            DepositType::Incr => "INCR",
            DepositType::Diff => "DIFF",
        })
    }
}

/// The deposit header: the TLD and the per-type counts the depositor declared.
///
/// Declared counts are a consistency oracle, not ground truth. Third-party
/// deposits are routinely off by a few records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositHeader {
    pub tld: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_type: Option<DepositType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,
    pub counts: EntityCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_uri_mapping() {
        assert_eq!(
            EntityKind::from_count_uri("urn:ietf:params:xml:ns:rdeDomain-1.0"),
            Some(EntityKind::Domain)
        );
        assert_eq!(
            EntityKind::from_count_uri("urn:ietf:params:xml:ns:rdeIDNTableReference-1.0"),
            Some(EntityKind::IdnTable)
        );
        assert_eq!(
            EntityKind::from_count_uri("urn:ietf:params:xml:ns:rdeNNDN-1.0"),
            Some(EntityKind::Nndn)
        );
        assert_eq!(
            EntityKind::from_count_uri("urn:ietf:params:xml:ns:rdeEppParams-1.0"),
            None
        );
    }

    #[test]
    fn counts_get_set_increment() {
        let mut counts = EntityCounts::default();
        counts.set(EntityKind::Host, 3);
        counts.increment(EntityKind::Host);
        counts.increment(EntityKind::Domain);
        assert_eq!(counts.get(EntityKind::Host), 4);
        assert_eq!(counts.get(EntityKind::Domain), 1);
        assert_eq!(counts.get(EntityKind::Contact), 0);
    }

    #[test]
    fn mismatches_lists_only_differing_kinds() {
        let declared = EntityCounts {
            domains: 2,
            hosts: 1,
            ..Default::default()
        };
        let observed = EntityCounts {
            domains: 2,
            hosts: 0,
            ..Default::default()
        };
        assert_eq!(
            declared.mismatches(&observed),
            vec![(EntityKind::Host, 1, 0)]
        );
    }

    #[test]
    fn deposit_type_parse_is_case_insensitive() {
        assert_eq!(DepositType::parse("full"), Some(DepositType::Full));
        assert_eq!(DepositType::parse(" INCR "), Some(DepositType::Incr));
        assert_eq!(DepositType::parse("weekly"), None);
    }
}
