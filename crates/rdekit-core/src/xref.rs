//! Cross-reference checks between extracted contacts, hosts and domains.

use std::collections::{BTreeMap, BTreeSet};

use crate::command::{ContactCommand, DomainCommand, HostCommand, References};

/// A contact referenced by some objects but absent from the contact set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingContact {
    pub contact_id: String,
    /// Keys of the referencing hosts and domains, sorted.
    pub referenced_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingHost {
    pub host_name: String,
    pub referenced_by: Vec<String>,
}

/// Distinct contact ids referenced by `hosts` and `domains`.
pub fn referenced_contact_ids(hosts: &[HostCommand], domains: &[DomainCommand]) -> BTreeSet<String> {
    hosts
        .iter()
        .flat_map(References::contact_ids)
        .chain(domains.iter().flat_map(References::contact_ids))
        .map(str::to_string)
        .collect()
}

/// Referenced contact ids that are not in `contacts`, sorted.
///
/// Works from the id set alone, so it can run off the persisted
/// contact-ids artifact.
pub fn missing_contacts(referenced: &BTreeSet<String>, contacts: &[ContactCommand]) -> Vec<String> {
    let known: BTreeSet<&str> = contacts.iter().map(|c| c.id.as_str()).collect();
    referenced
        .iter()
        .filter(|id| !known.contains(id.as_str()))
        .cloned()
        .collect()
}

/// Missing contacts along with who references them.
pub fn check_contacts(
    contacts: &[ContactCommand],
    hosts: &[HostCommand],
    domains: &[DomainCommand],
) -> Vec<MissingContact> {
    let known: BTreeSet<&str> = contacts.iter().map(|c| c.id.as_str()).collect();
    let mut missing: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();

    let host_refs = hosts.iter().map(|h| (h.key().to_string(), h.contact_ids()));
    let domain_refs = domains.iter().map(|d| (d.name.clone(), d.contact_ids()));
    for (owner, ids) in host_refs.chain(domain_refs) {
        for id in ids {
            if !known.contains(id) {
                missing.entry(id).or_default().insert(owner.clone());
            }
        }
    }

    missing
        .into_iter()
        .map(|(id, owners)| MissingContact {
            contact_id: id.to_string(),
            referenced_by: owners.into_iter().collect(),
        })
        .collect()
}

/// Nameservers referenced by domains with no host record in the deposit.
pub fn missing_hosts(hosts: &[HostCommand], domains: &[DomainCommand]) -> Vec<MissingHost> {
    let known: BTreeSet<&str> = hosts.iter().map(|h| h.name.as_str()).collect();
    let mut missing: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for domain in domains {
        for ns in &domain.nameservers {
            if !known.contains(ns.as_str()) {
                missing.entry(ns.as_str()).or_default().insert(domain.name.clone());
            }
        }
    }
    missing
        .into_iter()
        .map(|(name, owners)| MissingHost {
            host_name: name.to_string(),
            referenced_by: owners.into_iter().collect(),
        })
        .collect()
}
