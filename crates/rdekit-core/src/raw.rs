//! Escrow-format records as they appear in a deposit.
//!
//! Everything is optional strings: deposits from third parties are loosely
//! validated, and the extractors decide what is fatal for a record.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRegistrar {
    pub id: String,
    pub name: Option<String>,
    /// IANA registrar id (`gurid`).
    pub gurid: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawIdnTable {
    pub id: String,
    pub url: Option<String>,
    pub url_policy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPostalInfo {
    /// `int` or `loc`.
    pub kind: Option<String>,
    pub name: Option<String>,
    pub org: Option<String>,
    pub street: Vec<String>,
    pub city: Option<String>,
    pub sp: Option<String>,
    pub pc: Option<String>,
    pub cc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawContact {
    pub id: String,
    pub roid: Option<String>,
    pub statuses: Vec<String>,
    pub postal_info: Vec<RawPostalInfo>,
    pub voice: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub cl_id: Option<String>,
    pub cr_rr: Option<String>,
    pub cr_date: Option<String>,
    pub up_rr: Option<String>,
    pub up_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHostAddr {
    /// `v4` or `v6`; absent means v4 per EPP.
    pub ip: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHost {
    pub name: String,
    pub roid: Option<String>,
    pub statuses: Vec<String>,
    pub addrs: Vec<RawHostAddr>,
    pub cl_id: Option<String>,
    pub cr_rr: Option<String>,
    pub cr_date: Option<String>,
    pub up_rr: Option<String>,
    pub up_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawContactRef {
    /// `admin`, `tech` or `billing`.
    pub kind: Option<String>,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDomain {
    pub name: String,
    pub roid: Option<String>,
    pub u_name: Option<String>,
    pub idn_table_id: Option<String>,
    pub statuses: Vec<String>,
    pub registrant: Option<String>,
    pub contacts: Vec<RawContactRef>,
    /// Host names from `ns/hostObj` and `ns/hostAttr/hostName`.
    pub nameservers: Vec<String>,
    pub cl_id: Option<String>,
    pub cr_rr: Option<String>,
    pub cr_date: Option<String>,
    pub ex_date: Option<String>,
    pub up_rr: Option<String>,
    pub up_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNndn {
    pub a_name: String,
    pub u_name: Option<String>,
    pub idn_table_id: Option<String>,
    pub name_state: Option<String>,
    pub cr_date: Option<String>,
}
