//! Target-system validation rules applied to every extracted record.

use std::net::IpAddr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use thiserror::Error;

use crate::model::EntityKind;
use crate::status::{Status, conflicting_pair};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid contact id {0:?}")]
    InvalidContactId(String),

    #[error("invalid resource id {0:?}")]
    InvalidRoid(String),

    #[error("invalid host name {0:?}")]
    InvalidHostName(String),

    #[error("invalid domain name {0:?}")]
    InvalidDomainName(String),

    #[error("domain {name:?} is outside TLD {tld:?}")]
    OutsideTld { name: String, tld: String },

    #[error("unknown status {0:?}")]
    UnknownStatus(String),

    #[error("status {status} not allowed on a {kind}")]
    StatusNotAllowed { status: Status, kind: EntityKind },

    #[error("status {0} cannot be combined with {1}")]
    StatusConflict(Status, Status),

    #[error("invalid {version} address {value:?}")]
    InvalidAddress { version: String, value: String },

    #[error("invalid country code {0:?}")]
    InvalidCountryCode(String),

    #[error("invalid email {0:?}")]
    InvalidEmail(String),

    #[error("invalid timestamp in `{field}`: {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("unknown name state {0:?}")]
    UnknownNameState(String),

    #[error("unknown contact type {0:?}")]
    InvalidContactRole(String),

    #[error("unknown postal info type {0:?}")]
    InvalidPostalType(String),
}

static ROID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,80}-[A-Za-z0-9_]{1,8}$").ok());

/// Take a required field, failing with its name.
pub fn require(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingField(field))
}

pub fn contact_id(id: &str) -> Result<(), ValidationError> {
    let len = id.chars().count();
    if !(3..=16).contains(&len) || id.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidContactId(id.to_string()));
    }
    Ok(())
}

pub fn roid(roid: &str) -> Result<(), ValidationError> {
    if ROID.as_ref().is_some_and(|re| re.is_match(roid)) {
        Ok(())
    } else {
        Err(ValidationError::InvalidRoid(roid.to_string()))
    }
}

/// LDH syntax check; returns the lowercased name.
fn ldh_name(name: &str) -> Option<String> {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    if name.is_empty() || name.len() > 253 {
        return None;
    }
    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    let label_ok = |l: &&str| {
        !l.is_empty()
            && l.len() <= 63
            && !l.starts_with('-')
            && !l.ends_with('-')
            && l.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    };
    labels.iter().all(label_ok).then_some(name)
}

pub fn host_name(name: &str) -> Result<String, ValidationError> {
    ldh_name(name).ok_or_else(|| ValidationError::InvalidHostName(name.to_string()))
}

pub fn domain_name(name: &str, tld: &str) -> Result<String, ValidationError> {
    let normalized =
        ldh_name(name).ok_or_else(|| ValidationError::InvalidDomainName(name.to_string()))?;
    let tld = tld.trim_matches('.').to_ascii_lowercase();
    let inside = normalized
        .strip_suffix(tld.as_str())
        .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'));
    if !inside {
        return Err(ValidationError::OutsideTld {
            name: name.to_string(),
            tld,
        });
    }
    Ok(normalized)
}

/// Parse and check a status set for `kind`. Duplicates collapse.
pub fn statuses(kind: EntityKind, raw: &[String]) -> Result<Vec<Status>, ValidationError> {
    let mut parsed = Vec::with_capacity(raw.len());
    for s in raw {
        let status = Status::parse(s).ok_or_else(|| ValidationError::UnknownStatus(s.clone()))?;
        if !status.allowed_for(kind) {
            return Err(ValidationError::StatusNotAllowed { status, kind });
        }
        if !parsed.contains(&status) {
            parsed.push(status);
        }
    }
    if let Some((a, b)) = conflicting_pair(kind, &parsed) {
        return Err(ValidationError::StatusConflict(a, b));
    }
    Ok(parsed)
}

pub fn country_code(cc: &str) -> Result<String, ValidationError> {
    if cc.len() == 2 && cc.bytes().all(|b| b.is_ascii_alphabetic()) {
        Ok(cc.to_ascii_uppercase())
    } else {
        Err(ValidationError::InvalidCountryCode(cc.to_string()))
    }
}

pub fn email(email: &str) -> Result<(), ValidationError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(' ') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidEmail(email.to_string())),
    }
}

/// Parse an address declared as `v4` or `v6` (absent means v4).
pub fn address(version: Option<&str>, value: &str) -> Result<IpAddr, ValidationError> {
    let version = version.unwrap_or("v4");
    let invalid = || ValidationError::InvalidAddress {
        version: version.to_string(),
        value: value.to_string(),
    };
    let ip: IpAddr = value.trim().parse().map_err(|_| invalid())?;
    match (version, ip) {
        ("v4", IpAddr::V4(_)) | ("v6", IpAddr::V6(_)) => Ok(ip),
        _ => Err(invalid()),
    }
}

/// Parse an optional XML dateTime. Values without an offset are taken as UTC.
pub fn timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_ids() {
        assert!(contact_id("C-A").is_ok());
        assert!(contact_id("abcdefghijklmnop").is_ok());
        assert!(contact_id("ab").is_err());
        assert!(contact_id("abcdefghijklmnopq").is_err());
        assert!(contact_id("has space").is_err());
    }

    #[test]
    fn roids() {
        assert!(roid("D1-TLD").is_ok());
        assert!(roid("EXAMPLE1_2-REP").is_ok());
        assert!(roid("no-repo-dash-").is_err());
        assert!(roid("NOREPO").is_err());
        assert!(roid("A-TOOLONGREPO").is_err());
    }

    #[test]
    fn domain_names_must_sit_in_tld() {
        assert_eq!(domain_name("Example.TLD", "tld").unwrap(), "example.tld");
        assert!(matches!(
            domain_name("example.other", "tld"),
            Err(ValidationError::OutsideTld { .. })
        ));
        assert!(domain_name("notld", "notld").is_err());
        assert!(domain_name("-bad.tld", "tld").is_err());
        assert!(domain_name("a_b.tld", "tld").is_err());
        assert!(matches!(
            domain_name("xtld", "tld"),
            Err(ValidationError::InvalidDomainName(_))
        ));
    }

    #[test]
    fn host_names() {
        assert_eq!(host_name("NS1.Example.COM.").unwrap(), "ns1.example.com");
        assert!(host_name("localhost").is_err());
        assert!(host_name(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn status_rules() {
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();

        assert_eq!(
            statuses(EntityKind::Domain, &s(&["ok"])).unwrap(),
            vec![Status::Ok]
        );
        assert!(matches!(
            statuses(EntityKind::Domain, &s(&["ok", "clientHold"])),
            Err(ValidationError::StatusConflict(Status::Ok, Status::ClientHold))
        ));
        assert!(matches!(
            statuses(EntityKind::Domain, &s(&["pendingDelete", "clientDeleteProhibited"])),
            Err(ValidationError::StatusConflict(..))
        ));
        assert!(matches!(
            statuses(EntityKind::Host, &s(&["clientHold"])),
            Err(ValidationError::StatusNotAllowed { .. })
        ));
        assert!(matches!(
            statuses(EntityKind::Contact, &s(&["bogus"])),
            Err(ValidationError::UnknownStatus(_))
        ));
        assert_eq!(
            statuses(EntityKind::Domain, &s(&["clientHold", "clientHold"])).unwrap(),
            vec![Status::ClientHold]
        );
    }

    #[test]
    fn addresses_match_declared_version() {
        assert!(address(Some("v4"), "192.0.2.1").is_ok());
        assert!(address(None, "192.0.2.1").is_ok());
        assert!(address(Some("v6"), "2001:db8::1").is_ok());
        assert!(address(Some("v4"), "2001:db8::1").is_err());
        assert!(address(Some("v6"), "not-an-ip").is_err());
    }

    #[test]
    fn misc_fields() {
        assert_eq!(country_code("us").unwrap(), "US");
        assert!(country_code("USA").is_err());
        assert!(email("a@b").is_ok());
        assert!(email("nobody").is_err());
        assert_eq!(require("clID", Some("  ")), Err(ValidationError::MissingField("clID")));
    }

    #[test]
    fn timestamps() {
        let parsed = timestamp("crDate", Some("2020-01-01T10:00:00.5+02:00"))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.to_rfc3339(), "2020-01-01T08:00:00.500+00:00");
        assert!(timestamp("crDate", Some("2020-01-01T10:00:00")).unwrap().is_some());
        assert_eq!(timestamp("crDate", None).unwrap(), None);
        assert!(timestamp("crDate", Some("yesterday")).is_err());
    }
}
