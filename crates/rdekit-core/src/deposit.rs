//! Streaming reader for RDE deposits (RFC 8909 / RFC 9022 layout).
//!
//! The reader walks the document once. It materialises the `<header>`,
//! the `<watermark>` and each direct child of `<contents>` as a small tree
//! and converts it to a raw record; everything else streams past. Memory is
//! bounded by the largest single record.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{DepositHeader, DepositType, EntityCounts, EntityKind};
use crate::raw::*;
use crate::xml::{Element, element_from_start, local_name, read_element};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read deposit {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed deposit header: {0}")]
    MalformedHeader(String),

    #[error("deposit ends inside <{0}>")]
    UnexpectedEof(String),
}

/// Everything read from one deposit file.
#[derive(Debug, Clone, Default)]
pub struct Deposit {
    pub header: DepositHeader,
    pub registrars: Vec<RawRegistrar>,
    pub idn_tables: Vec<RawIdnTable>,
    pub contacts: Vec<RawContact>,
    pub hosts: Vec<RawHost>,
    pub domains: Vec<RawDomain>,
    pub nndns: Vec<RawNndn>,
    /// Record elements under `<contents>` this reader does not know, by local name.
    pub unknown_elements: BTreeMap<String, usize>,
}

impl Deposit {
    /// Number of records of each kind actually present in the file.
    pub fn record_counts(&self) -> EntityCounts {
        EntityCounts {
            registrars: self.registrars.len() as u64,
            idn_tables: self.idn_tables.len() as u64,
            contacts: self.contacts.len() as u64,
            hosts: self.hosts.len() as u64,
            domains: self.domains.len() as u64,
            nndns: self.nndns.len() as u64,
        }
    }
}

/// Parse a whole deposit file.
pub fn parse_deposit_file(path: &Path) -> Result<Deposit, ParseError> {
    let file = open(path)?;
    let deposit = parse_deposit(BufReader::new(file))?;
    info!(
        path = %path.display(),
        tld = %deposit.header.tld,
        domains = deposit.domains.len(),
        hosts = deposit.hosts.len(),
        contacts = deposit.contacts.len(),
        "parsed deposit"
    );
    Ok(deposit)
}

/// Parse only the header of a deposit file, stopping as soon as it closes.
pub fn parse_header_only_file(path: &Path) -> Result<DepositHeader, ParseError> {
    let file = open(path)?;
    parse_header_only(BufReader::new(file))
}

fn open(path: &Path) -> Result<File, ParseError> {
    File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_deposit<R: BufRead>(src: R) -> Result<Deposit, ParseError> {
    let mut deposit = Deposit::default();
    let header = walk(src, false, |el| {
        match EntityKind::from_element(&el.name) {
            Some(EntityKind::Registrar) => deposit.registrars.push(registrar_from(&el)),
            Some(EntityKind::IdnTable) => deposit.idn_tables.push(idn_table_from(&el)),
            Some(EntityKind::Contact) => deposit.contacts.push(contact_from(&el)),
            Some(EntityKind::Host) => deposit.hosts.push(host_from(&el)),
            Some(EntityKind::Domain) => deposit.domains.push(domain_from(&el)),
            Some(EntityKind::Nndn) => deposit.nndns.push(nndn_from(&el)),
            None => {
                debug!(element = %el.name, "skipping unknown deposit element");
                *deposit.unknown_elements.entry(el.name).or_default() += 1;
            }
        }
    })?;
    deposit.header = header;
    Ok(deposit)
}

pub fn parse_header_only<R: BufRead>(src: R) -> Result<DepositHeader, ParseError> {
    walk(src, true, |_| {})
}

/// Drive the event loop. Calls `on_record` for each non-header child of
/// `<contents>` and returns the header, which must be present.
fn walk<R, F>(src: R, header_only: bool, mut on_record: F) -> Result<DepositHeader, ParseError>
where
    R: BufRead,
    F: FnMut(Element),
{
    let mut reader = Reader::from_reader(src);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut header: Option<DepositHeader> = None;
    let mut deposit_type = None;
    let mut deposit_id = None;
    let mut watermark = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local_name(&e);
                let parent = path.last().map(String::as_str);
                match (parent, name.as_str()) {
                    (None, "deposit") => {
                        let el = element_from_start(&e)?;
                        deposit_type = el.attr("type").and_then(DepositType::parse);
                        deposit_id = el.attr("id").map(str::to_string);
                        path.push(name);
                    }
                    (Some("deposit"), "watermark") => {
                        let start = e.into_owned();
                        watermark = read_element(&mut reader, &start)?.value();
                    }
                    (Some("contents"), "header") => {
                        let start = e.into_owned();
                        header = Some(header_from(&read_element(&mut reader, &start)?)?);
                        if header_only {
                            break;
                        }
                    }
                    (Some("contents"), _) => {
                        let start = e.into_owned();
                        on_record(read_element(&mut reader, &start)?);
                    }
                    _ => path.push(name),
                }
            }
            Event::Empty(e) => {
                if path.last().map(String::as_str) == Some("contents") {
                    on_record(element_from_start(&e)?);
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let mut header =
        header.ok_or_else(|| ParseError::MalformedHeader("header section absent".into()))?;
    header.deposit_type = deposit_type;
    header.deposit_id = deposit_id;
    header.watermark = watermark;
    Ok(header)
}

// ── Element → raw record ──

fn header_from(el: &Element) -> Result<DepositHeader, ParseError> {
    let tld = el
        .child_text("tld")
        .ok_or_else(|| ParseError::MalformedHeader("missing tld".into()))?;

    let mut counts = EntityCounts::default();
    for count in el.children_named("count") {
        let uri = count.attr("uri").unwrap_or_default();
        let text = count.value().unwrap_or_default();
        let value: u64 = text.parse().map_err(|_| {
            ParseError::MalformedHeader(format!("non-numeric count {text:?} for {uri:?}"))
        })?;
        if let Some(kind) = EntityKind::from_count_uri(uri) {
            counts.set(kind, value);
        }
    }

    Ok(DepositHeader {
        tld: tld.to_ascii_lowercase(),
        deposit_id: None,
        deposit_type: None,
        watermark: None,
        counts,
    })
}

fn registrar_from(el: &Element) -> RawRegistrar {
    RawRegistrar {
        id: el.child_text("id").unwrap_or_default(),
        name: el.child_text("name"),
        gurid: el.child_text("gurid"),
        status: el.child_text("status"),
    }
}

fn idn_table_from(el: &Element) -> RawIdnTable {
    RawIdnTable {
        id: el.attr("id").map(str::to_string).unwrap_or_default(),
        url: el.child_text("url"),
        url_policy: el.child_text("urlPolicy"),
    }
}

fn statuses(el: &Element) -> Vec<String> {
    el.children_named("status")
        .filter_map(|s| s.attr("s").map(str::to_string))
        .collect()
}

fn contact_from(el: &Element) -> RawContact {
    let postal_info = el
        .children_named("postalInfo")
        .map(|p| {
            let addr = p.child("addr");
            let addr_text = |name: &str| addr.and_then(|a| a.child_text(name));
            RawPostalInfo {
                kind: p.attr("type").map(str::to_string),
                name: p.child_text("name"),
                org: p.child_text("org"),
                street: addr.map(|a| a.child_texts("street")).unwrap_or_default(),
                city: addr_text("city"),
                sp: addr_text("sp"),
                pc: addr_text("pc"),
                cc: addr_text("cc"),
            }
        })
        .collect();

    RawContact {
        id: el.child_text("id").unwrap_or_default(),
        roid: el.child_text("roid"),
        statuses: statuses(el),
        postal_info,
        voice: el.child_text("voice"),
        fax: el.child_text("fax"),
        email: el.child_text("email"),
        cl_id: el.child_text("clID"),
        cr_rr: el.child_text("crRr"),
        cr_date: el.child_text("crDate"),
        up_rr: el.child_text("upRr"),
        up_date: el.child_text("upDate"),
    }
}

fn host_from(el: &Element) -> RawHost {
    RawHost {
        name: el.child_text("name").unwrap_or_default(),
        roid: el.child_text("roid"),
        statuses: statuses(el),
        addrs: el
            .children_named("addr")
            .filter_map(|a| {
                a.value().map(|value| RawHostAddr {
                    ip: a.attr("ip").map(str::to_string),
                    value,
                })
            })
            .collect(),
        cl_id: el.child_text("clID"),
        cr_rr: el.child_text("crRr"),
        cr_date: el.child_text("crDate"),
        up_rr: el.child_text("upRr"),
        up_date: el.child_text("upDate"),
    }
}

fn domain_from(el: &Element) -> RawDomain {
    let mut nameservers = Vec::new();
    for ns in el.children_named("ns") {
        nameservers.extend(ns.child_texts("hostObj"));
        for attr in ns.children_named("hostAttr") {
            nameservers.extend(attr.child_text("hostName"));
        }
    }

    RawDomain {
        name: el.child_text("name").unwrap_or_default(),
        roid: el.child_text("roid"),
        u_name: el.child_text("uName"),
        idn_table_id: el.child_text("idnTableId"),
        statuses: statuses(el),
        registrant: el.child_text("registrant"),
        contacts: el
            .children_named("contact")
            .filter_map(|c| {
                c.value().map(|id| RawContactRef {
                    kind: c.attr("type").map(str::to_string),
                    id,
                })
            })
            .collect(),
        nameservers,
        cl_id: el.child_text("clID"),
        cr_rr: el.child_text("crRr"),
        cr_date: el.child_text("crDate"),
        ex_date: el.child_text("exDate"),
        up_rr: el.child_text("upRr"),
        up_date: el.child_text("upDate"),
    }
}

fn nndn_from(el: &Element) -> RawNndn {
    RawNndn {
        a_name: el.child_text("aName").unwrap_or_default(),
        u_name: el.child_text("uName"),
        idn_table_id: el.child_text("idnTableId"),
        name_state: el.child_text("nameState"),
        cr_date: el.child_text("crDate"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rde:deposit type="FULL" id="20240101001"
    xmlns:rde="urn:ietf:params:xml:ns:rde-1.0"
    xmlns:rdeHeader="urn:ietf:params:xml:ns:rdeHeader-1.0"
    xmlns:rdeDomain="urn:ietf:params:xml:ns:rdeDomain-1.0"
    xmlns:rdeHost="urn:ietf:params:xml:ns:rdeHost-1.0"
    xmlns:rdeContact="urn:ietf:params:xml:ns:rdeContact-1.0"
    xmlns:rdeRegistrar="urn:ietf:params:xml:ns:rdeRegistrar-1.0"
    xmlns:rdeNNDN="urn:ietf:params:xml:ns:rdeNNDN-1.0"
    xmlns:domain="urn:ietf:params:xml:ns:domain-1.0"
    xmlns:contact="urn:ietf:params:xml:ns:contact-1.0">
  <rde:watermark>2024-01-01T00:00:00Z</rde:watermark>
  <rde:rdeMenu>
    <rde:version>1.0</rde:version>
  </rde:rdeMenu>
  <rde:contents>
    <rdeHeader:header>
      <rdeHeader:tld>tld</rdeHeader:tld>
      <rdeHeader:count uri="urn:ietf:params:xml:ns:rdeRegistrar-1.0">2</rdeHeader:count>
      <rdeHeader:count uri="urn:ietf:params:xml:ns:rdeContact-1.0">2</rdeHeader:count>
      <rdeHeader:count uri="urn:ietf:params:xml:ns:rdeHost-1.0">1</rdeHeader:count>
      <rdeHeader:count uri="urn:ietf:params:xml:ns:rdeDomain-1.0">2</rdeHeader:count>
      <rdeHeader:count uri="urn:ietf:params:xml:ns:rdeNNDN-1.0">1</rdeHeader:count>
    </rdeHeader:header>
    <rdeRegistrar:registrar>
      <rdeRegistrar:id>RAR-A</rdeRegistrar:id>
      <rdeRegistrar:name>Registrar A</rdeRegistrar:name>
      <rdeRegistrar:gurid>1001</rdeRegistrar:gurid>
      <rdeRegistrar:status>ok</rdeRegistrar:status>
    </rdeRegistrar:registrar>
    <rdeRegistrar:registrar>
      <rdeRegistrar:id>RAR-B</rdeRegistrar:id>
      <rdeRegistrar:name>Registrar B</rdeRegistrar:name>
      <rdeRegistrar:gurid>1002</rdeRegistrar:gurid>
    </rdeRegistrar:registrar>
    <rdeContact:contact>
      <rdeContact:id>C-A</rdeContact:id>
      <rdeContact:roid>CA1-TLD</rdeContact:roid>
      <rdeContact:status s="ok"/>
      <rdeContact:postalInfo type="int">
        <contact:name>Alice Admin</contact:name>
        <contact:addr>
          <contact:street>1 Main St</contact:street>
          <contact:city>Springfield</contact:city>
          <contact:cc>US</contact:cc>
        </contact:addr>
      </rdeContact:postalInfo>
      <rdeContact:email>alice@example.com</rdeContact:email>
      <rdeContact:clID>RAR-A</rdeContact:clID>
      <rdeContact:crDate>2020-01-01T00:00:00Z</rdeContact:crDate>
    </rdeContact:contact>
    <rdeContact:contact>
      <rdeContact:id>C-B</rdeContact:id>
      <rdeContact:roid>CB1-TLD</rdeContact:roid>
      <rdeContact:status s="ok"/>
      <rdeContact:postalInfo type="loc">
        <contact:name>Bob Billing</contact:name>
        <contact:addr>
          <contact:city>Shelbyville</contact:city>
          <contact:cc>US</contact:cc>
        </contact:addr>
      </rdeContact:postalInfo>
      <rdeContact:email>bob@example.com</rdeContact:email>
      <rdeContact:clID>RAR-B</rdeContact:clID>
    </rdeContact:contact>
    <rdeHost:host>
      <rdeHost:name>ns1.example.tld</rdeHost:name>
      <rdeHost:roid>H1-TLD</rdeHost:roid>
      <rdeHost:status s="ok"/>
      <rdeHost:addr ip="v4">192.0.2.1</rdeHost:addr>
      <rdeHost:clID>RAR-A</rdeHost:clID>
    </rdeHost:host>
    <rdeDomain:domain>
      <rdeDomain:name>example.tld</rdeDomain:name>
      <rdeDomain:roid>D1-TLD</rdeDomain:roid>
      <rdeDomain:status s="ok"/>
      <rdeDomain:registrant>C-A</rdeDomain:registrant>
      <rdeDomain:contact type="admin">C-A</rdeDomain:contact>
      <rdeDomain:ns>
        <domain:hostObj>ns1.example.tld</domain:hostObj>
      </rdeDomain:ns>
      <rdeDomain:clID>RAR-A</rdeDomain:clID>
      <rdeDomain:crDate>2020-01-01T00:00:00Z</rdeDomain:crDate>
      <rdeDomain:exDate>2030-01-01T00:00:00Z</rdeDomain:exDate>
    </rdeDomain:domain>
    <rdeDomain:domain>
      <rdeDomain:name>other.tld</rdeDomain:name>
      <rdeDomain:roid>D2-TLD</rdeDomain:roid>
      <rdeDomain:status s="clientHold"/>
      <rdeDomain:registrant>C-B</rdeDomain:registrant>
      <rdeDomain:ns>
        <domain:hostAttr>
          <domain:hostName>ns1.example.tld</domain:hostName>
        </domain:hostAttr>
      </rdeDomain:ns>
      <rdeDomain:clID>RAR-B</rdeDomain:clID>
    </rdeDomain:domain>
    <rdeNNDN:NNDN>
      <rdeNNDN:aName>reserved.tld</rdeNNDN:aName>
      <rdeNNDN:nameState>blocked</rdeNNDN:nameState>
    </rdeNNDN:NNDN>
    <rdeEppParams:eppParams xmlns:rdeEppParams="urn:ietf:params:xml:ns:rdeEppParams-1.0">
      <rdeEppParams:version>1.0</rdeEppParams:version>
    </rdeEppParams:eppParams>
  </rde:contents>
</rde:deposit>"#;

    #[test]
    fn parses_header_and_metadata() {
        let deposit = parse_deposit(SAMPLE.as_bytes()).unwrap();
        let header = &deposit.header;
        assert_eq!(header.tld, "tld");
        assert_eq!(header.deposit_type, Some(DepositType::Full));
        assert_eq!(header.deposit_id.as_deref(), Some("20240101001"));
        assert_eq!(header.watermark.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(header.counts.domains, 2);
        assert_eq!(header.counts.hosts, 1);
        assert_eq!(header.counts.idn_tables, 0);
    }

    #[test]
    fn declared_counts_match_records_for_consistent_deposit() {
        let deposit = parse_deposit(SAMPLE.as_bytes()).unwrap();
        assert_eq!(deposit.record_counts(), deposit.header.counts);
    }

    #[test]
    fn parses_records() {
        let deposit = parse_deposit(SAMPLE.as_bytes()).unwrap();

        assert_eq!(deposit.registrars[0].gurid.as_deref(), Some("1001"));

        let alice = &deposit.contacts[0];
        assert_eq!(alice.id, "C-A");
        assert_eq!(alice.statuses, vec!["ok"]);
        assert_eq!(alice.postal_info[0].kind.as_deref(), Some("int"));
        assert_eq!(alice.postal_info[0].street, vec!["1 Main St"]);
        assert_eq!(alice.postal_info[0].cc.as_deref(), Some("US"));

        let host = &deposit.hosts[0];
        assert_eq!(host.addrs[0].ip.as_deref(), Some("v4"));
        assert_eq!(host.addrs[0].value, "192.0.2.1");

        let example = &deposit.domains[0];
        assert_eq!(example.registrant.as_deref(), Some("C-A"));
        assert_eq!(example.contacts[0].kind.as_deref(), Some("admin"));
        assert_eq!(example.nameservers, vec!["ns1.example.tld"]);
        assert_eq!(deposit.domains[1].nameservers, vec!["ns1.example.tld"]);

        assert_eq!(deposit.nndns[0].name_state.as_deref(), Some("blocked"));
        assert_eq!(deposit.unknown_elements.get("eppParams"), Some(&1));
    }

    #[test]
    fn header_only_stops_early() {
        let header = parse_header_only(SAMPLE.as_bytes()).unwrap();
        assert_eq!(header.tld, "tld");
        assert_eq!(header.counts.contacts, 2);
        assert_eq!(header.deposit_type, Some(DepositType::Full));
    }

    #[test]
    fn missing_header_is_malformed() {
        let xml = r#"<rde:deposit xmlns:rde="urn:x"><rde:contents/></rde:deposit>"#;
        assert!(matches!(
            parse_deposit(xml.as_bytes()),
            Err(ParseError::MalformedHeader(_))
        ));
    }

    #[test]
    fn non_numeric_count_is_malformed() {
        let xml = r#"<deposit><contents><header><tld>tld</tld>
            <count uri="urn:ietf:params:xml:ns:rdeDomain-1.0">many</count>
            </header></contents></deposit>"#;
        let err = parse_deposit(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader(msg) if msg.contains("many")));
    }

    #[test]
    fn missing_tld_is_malformed() {
        let xml = "<deposit><contents><header><count uri=\"x\">1</count></header></contents></deposit>";
        assert!(matches!(
            parse_deposit(xml.as_bytes()),
            Err(ParseError::MalformedHeader(_))
        ));
    }

    #[test]
    fn broken_xml_is_a_parse_error() {
        let xml = "<deposit><contents><header><tld>tld</tld></header><domain><name>x</nme></domain></contents></deposit>";
        assert!(parse_deposit(xml.as_bytes()).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = parse_deposit_file(Path::new("/nonexistent/deposit.xml")).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
