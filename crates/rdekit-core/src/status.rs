//! EPP object statuses and the combination rules the target registry enforces.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::EntityKind;

/// An EPP status value (RFC 5731 / 5732 / 5733 vocabularies, merged).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Ok,
    Linked,
    Inactive,
    ClientDeleteProhibited,
    ClientHold,
    ClientRenewProhibited,
    ClientTransferProhibited,
    ClientUpdateProhibited,
    ServerDeleteProhibited,
    ServerHold,
    ServerRenewProhibited,
    ServerTransferProhibited,
    ServerUpdateProhibited,
    PendingCreate,
    PendingDelete,
    PendingRenew,
    PendingTransfer,
    PendingUpdate,
}

const STATUS_NAMES: &[(Status, &str)] = &[
    (Status::Ok, "ok"),
    (Status::Linked, "linked"),
    (Status::Inactive, "inactive"),
    (Status::ClientDeleteProhibited, "clientDeleteProhibited"),
    (Status::ClientHold, "clientHold"),
    (Status::ClientRenewProhibited, "clientRenewProhibited"),
    (Status::ClientTransferProhibited, "clientTransferProhibited"),
    (Status::ClientUpdateProhibited, "clientUpdateProhibited"),
    (Status::ServerDeleteProhibited, "serverDeleteProhibited"),
    (Status::ServerHold, "serverHold"),
    (Status::ServerRenewProhibited, "serverRenewProhibited"),
    (Status::ServerTransferProhibited, "serverTransferProhibited"),
    (Status::ServerUpdateProhibited, "serverUpdateProhibited"),
    (Status::PendingCreate, "pendingCreate"),
    (Status::PendingDelete, "pendingDelete"),
    (Status::PendingRenew, "pendingRenew"),
    (Status::PendingTransfer, "pendingTransfer"),
    (Status::PendingUpdate, "pendingUpdate"),
];

impl Status {
    /// Parse the `s` attribute of a `<status>` element. Matching is exact:
    /// EPP status tokens are case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        STATUS_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(status, _)| *status)
    }

    pub fn as_str(&self) -> &'static str {
        STATUS_NAMES
            .iter()
            .find(|(status, _)| status == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Status::PendingCreate
                | Status::PendingDelete
                | Status::PendingRenew
                | Status::PendingTransfer
                | Status::PendingUpdate
        )
    }

    /// Whether the status exists in the EPP mapping for `kind`.
    pub fn allowed_for(&self, kind: EntityKind) -> bool {
        use Status::*;
        match kind {
            EntityKind::Domain => !matches!(self, Linked),
            EntityKind::Host => matches!(
                self,
                Ok | Linked
                    | ClientDeleteProhibited
                    | ClientUpdateProhibited
                    | ServerDeleteProhibited
                    | ServerUpdateProhibited
                    | PendingCreate
                    | PendingDelete
                    | PendingTransfer
                    | PendingUpdate
            ),
            EntityKind::Contact => matches!(
                self,
                Ok | Linked
                    | ClientDeleteProhibited
                    | ClientTransferProhibited
                    | ClientUpdateProhibited
                    | ServerDeleteProhibited
                    | ServerTransferProhibited
                    | ServerUpdateProhibited
                    | PendingCreate
                    | PendingDelete
                    | PendingTransfer
                    | PendingUpdate
            ),
            EntityKind::Registrar | EntityKind::IdnTable | EntityKind::Nndn => false,
        }
    }

    /// Whether `ok` may sit alongside this status on an object of `kind`.
    fn pairs_with_ok(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Host | EntityKind::Contact => *self == Status::Linked,
            EntityKind::Domain => *self == Status::Inactive,
            _ => false,
        }
    }

    /// Statuses a pending action cannot coexist with.
    fn prohibitions(&self) -> &'static [Status] {
        match self {
            Status::PendingDelete => &[Status::ClientDeleteProhibited, Status::ServerDeleteProhibited],
            Status::PendingRenew => &[Status::ClientRenewProhibited, Status::ServerRenewProhibited],
            Status::PendingTransfer => &[
                Status::ClientTransferProhibited,
                Status::ServerTransferProhibited,
            ],
            Status::PendingUpdate => &[Status::ClientUpdateProhibited, Status::ServerUpdateProhibited],
            _ => &[],
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Find the first illegal pair in a status set, if any.
///
/// Rules: `ok` only pairs with `linked` (hosts, contacts) or `inactive`
/// (domains), at most one `pending*` status, and a pending action never
/// coexists with the matching `*Prohibited` status.
pub fn conflicting_pair(kind: EntityKind, statuses: &[Status]) -> Option<(Status, Status)> {
    if statuses.contains(&Status::Ok)
        && let Some(other) = statuses
            .iter()
            .find(|s| **s != Status::Ok && !s.pairs_with_ok(kind))
    {
        return Some((Status::Ok, *other));
    }

    let pending: Vec<Status> = statuses.iter().copied().filter(Status::is_pending).collect();
    if pending.len() > 1 {
        return Some((pending[0], pending[1]));
    }

    for status in statuses {
        if let Some(blocker) = status
            .prohibitions()
            .iter()
            .find(|p| statuses.contains(p))
        {
            return Some((*status, *blocker));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_names() {
        for (status, name) in STATUS_NAMES {
            assert_eq!(Status::parse(name), Some(*status));
            assert_eq!(status.as_str(), *name);
        }
        assert_eq!(Status::parse("OK"), None);
        assert_eq!(Status::parse("frozen"), None);
    }

    #[test]
    fn serde_uses_epp_tokens() {
        let json = serde_json::to_string(&Status::ClientTransferProhibited).unwrap();
        assert_eq!(json, "\"clientTransferProhibited\"");
    }

    #[test]
    fn vocabulary_per_kind() {
        assert!(Status::ClientHold.allowed_for(EntityKind::Domain));
        assert!(!Status::ClientHold.allowed_for(EntityKind::Host));
        assert!(!Status::Linked.allowed_for(EntityKind::Domain));
        assert!(Status::Linked.allowed_for(EntityKind::Contact));
        assert!(!Status::PendingRenew.allowed_for(EntityKind::Contact));
    }

    #[test]
    fn ok_cannot_combine() {
        assert_eq!(
            conflicting_pair(EntityKind::Domain, &[Status::Ok, Status::ClientHold]),
            Some((Status::Ok, Status::ClientHold))
        );
        assert_eq!(conflicting_pair(EntityKind::Domain, &[Status::Ok]), None);
    }

    #[test]
    fn ok_with_linked_on_hosts_and_contacts() {
        for kind in [EntityKind::Host, EntityKind::Contact] {
            assert_eq!(conflicting_pair(kind, &[Status::Ok, Status::Linked]), None);
            assert_eq!(
                conflicting_pair(kind, &[Status::Ok, Status::Linked, Status::ClientDeleteProhibited]),
                Some((Status::Ok, Status::ClientDeleteProhibited))
            );
        }
        assert_eq!(
            conflicting_pair(EntityKind::Host, &[Status::Ok, Status::Inactive]),
            Some((Status::Ok, Status::Inactive))
        );
    }

    #[test]
    fn ok_with_inactive_on_domains() {
        assert_eq!(conflicting_pair(EntityKind::Domain, &[Status::Inactive, Status::Ok]), None);
        assert_eq!(
            conflicting_pair(EntityKind::Domain, &[Status::Ok, Status::Inactive, Status::ClientHold]),
            Some((Status::Ok, Status::ClientHold))
        );
    }

    #[test]
    fn single_pending_action() {
        assert_eq!(
            conflicting_pair(EntityKind::Domain, &[Status::PendingDelete, Status::PendingTransfer]),
            Some((Status::PendingDelete, Status::PendingTransfer))
        );
    }

    #[test]
    fn pending_against_prohibition() {
        assert_eq!(
            conflicting_pair(EntityKind::Domain, &[Status::ServerDeleteProhibited, Status::PendingDelete]),
            Some((Status::PendingDelete, Status::ServerDeleteProhibited))
        );
        assert_eq!(
            conflicting_pair(EntityKind::Domain, &[Status::ClientHold, Status::PendingDelete]),
            None
        );
    }
}
