//! Host sponsorship resolution.
//!
//! The target system allows one sponsoring registrar per host object, while a
//! deposit may have a host name in use by domains of several registrars. Each
//! host name gets one copy per sponsor that needs it; each domain links to the
//! copy owned by its own sponsor.
//!
//! Identity scheme: a host is identified by `(name, sponsor)`. The *origin*
//! copy keeps the deposit's ROID; every other copy records the origin sponsor
//! in `duplicate_of` and, when ROIDs are preserved, gets the ROID
//! `<base>_<8 hex of SHA-256(sponsor)>-<repo>`. Copies are always regenerated
//! from origins, so resolving an already resolved set changes nothing.

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::command::{DomainCommand, HostCommand, HostLink};

/// Longest ROID base that still leaves room for the sponsor suffix.
const MAX_COPY_BASE: usize = 80 - 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatedHost {
    pub name: String,
    /// Every sponsor the host now exists under, sorted.
    pub sponsors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Origins in input order, each followed by its copies sorted by sponsor.
    pub hosts: Vec<HostCommand>,
    /// Input domains with `host_links` rebuilt.
    pub domains: Vec<DomainCommand>,
    pub duplicated: Vec<DuplicatedHost>,
}

pub fn resolve_host_sponsorship(hosts: &[HostCommand], domains: &[DomainCommand]) -> Resolution {
    let mut origins: Vec<&HostCommand> = Vec::new();
    let mut known: BTreeSet<&str> = BTreeSet::new();
    for host in hosts.iter().filter(|h| h.duplicate_of.is_none()) {
        if known.insert(host.name.as_str()) {
            origins.push(host);
        }
    }

    let mut required: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for domain in domains {
        for ns in &domain.nameservers {
            if known.contains(ns.as_str()) {
                required
                    .entry(ns.as_str())
                    .or_default()
                    .insert(domain.sponsor.as_str());
            }
        }
    }

    let mut out = Resolution::default();
    for origin in origins {
        let own = BTreeSet::from([origin.sponsor.as_str()]);
        let sponsors = required.get(origin.name.as_str()).unwrap_or(&own);

        let origin_sponsor = if sponsors.contains(origin.sponsor.as_str()) {
            origin.sponsor.as_str()
        } else {
            sponsors.first().copied().unwrap_or(origin.sponsor.as_str())
        };

        out.hosts.push(HostCommand {
            sponsor: origin_sponsor.to_string(),
            duplicate_of: None,
            ..origin.clone()
        });

        for sponsor in sponsors.iter().filter(|s| **s != origin_sponsor) {
            debug!(host = %origin.name, sponsor, origin = origin_sponsor, "duplicating host");
            out.hosts.push(HostCommand {
                sponsor: sponsor.to_string(),
                resource_id: origin.resource_id.as_deref().map(|r| duplicate_roid(r, sponsor)),
                duplicate_of: Some(origin_sponsor.to_string()),
                ..origin.clone()
            });
        }

        if sponsors.len() > 1 {
            out.duplicated.push(DuplicatedHost {
                name: origin.name.clone(),
                sponsors: sponsors.iter().map(|s| s.to_string()).collect(),
            });
        }
    }

    out.domains = domains
        .iter()
        .map(|d| DomainCommand {
            host_links: d
                .nameservers
                .iter()
                .filter(|ns| known.contains(ns.as_str()))
                .map(|ns| HostLink {
                    host_name: ns.clone(),
                    sponsor: d.sponsor.clone(),
                })
                .collect(),
            ..d.clone()
        })
        .collect();

    if !out.duplicated.is_empty() {
        info!(
            duplicated = out.duplicated.len(),
            hosts = out.hosts.len(),
            "resolved multi-sponsor hosts"
        );
    }
    out
}

/// ROID for the copy of a host owned by `sponsor`.
pub fn duplicate_roid(roid: &str, sponsor: &str) -> String {
    let digest = Sha256::digest(sponsor.as_bytes());
    let tag: String = digest[..4].iter().map(|b| format!("{b:02X}")).collect();

    match roid.rsplit_once('-') {
        Some((base, repo)) => {
            let base = &base[..base.len().min(MAX_COPY_BASE)];
            format!("{base}_{tag}-{repo}")
        }
        None => format!("{roid}_{tag}"),
    }
}
