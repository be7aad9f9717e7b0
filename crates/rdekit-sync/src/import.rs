//! The staged import: replays an [`AnalysisResult`] against a [`RegistryApi`].
//!
//! Stages run strictly in order. Within a stage, commands are chunked and up
//! to `workers` chunks are in flight at once; commands inside a chunk go out
//! in order. Imports are forward-only: failures are recorded in the
//! [`ImportLog`] and the run carries on.

use std::collections::HashSet;
use std::fmt;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use rdekit_core::command::{Command, HostKey, LinkCommand};
use rdekit_core::{
    AnalysisResult, Chunks, EntityCounts, ImportConfig, MappingError, RegistrarIdMap,
    RegistrarOverrides,
};
use rdekit_store::{Counters, FailureRecord, ImportLog, StageReport, StageStatus, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, RegistryApi};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("TLD {0:?} does not exist in the target registry")]
    MissingTld(String),
    #[error("{count} command(s) reference unmapped registrars; add overrides or tolerate unmapped registrars")]
    UnmappedRegistrars { count: usize },
    #[error("registrar mapping error: {0}")]
    Mapping(#[from] MappingError),
    #[error("registry API error: {0}")]
    Api(#[from] ApiError),
    #[error("cannot write import log: {0}")]
    Store(#[from] StoreError),
}

// ── Stage table ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Registrars,
    Contacts,
    Nndn,
    Hosts,
    Domains,
    LinkHostsToDomains,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Registrars => "registrars",
            Stage::Contacts => "contacts",
            Stage::Nndn => "nndn",
            Stage::Hosts => "hosts",
            Stage::Domains => "domains",
            Stage::LinkHostsToDomains => "link_hosts_to_domains",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct StageDescriptor {
    stage: Stage,
    /// Whether the header declares anything for this stage to do.
    enabled: fn(&EntityCounts) -> bool,
    plan: fn(&Planner<'_>) -> Vec<Job>,
}

const STAGES: [StageDescriptor; 6] = [
    StageDescriptor {
        stage: Stage::Registrars,
        enabled: |c| c.registrars > 0,
        plan: plan_registrars,
    },
    StageDescriptor {
        stage: Stage::Contacts,
        enabled: |c| c.contacts > 0,
        plan: plan_contacts,
    },
    StageDescriptor {
        stage: Stage::Nndn,
        enabled: |c| c.nndns > 0,
        plan: plan_nndns,
    },
    StageDescriptor {
        stage: Stage::Hosts,
        enabled: |c| c.hosts > 0,
        plan: plan_hosts,
    },
    StageDescriptor {
        stage: Stage::Domains,
        enabled: |c| c.domains > 0,
        plan: plan_domains,
    },
    StageDescriptor {
        stage: Stage::LinkHostsToDomains,
        enabled: |c| c.domains > 0 && c.hosts > 0,
        plan: plan_links,
    },
];

/// Stage names in execution order.
pub fn stage_order() -> impl Iterator<Item = Stage> {
    STAGES.iter().map(|d| d.stage)
}

// ── Jobs ──

/// Objects committed so far, keyed by *source* identifiers.
#[derive(Debug, Default)]
struct Committed {
    contacts: HashSet<String>,
    hosts: HashSet<HostKey>,
    domains: HashSet<String>,
}

#[derive(Debug, Clone)]
enum Provides {
    Contact(String),
    Host(HostKey),
    Domain(String),
}

#[derive(Debug, Clone)]
enum Action {
    VerifyRegistrar { target: String },
    Submit(Command),
    Skip { command: Option<Command>, reason: String },
}

#[derive(Debug, Clone)]
struct Job {
    key: String,
    action: Action,
    provides: Option<Provides>,
}

impl Job {
    fn submit(command: Command, provides: Option<Provides>) -> Self {
        Job {
            key: command.key(),
            action: Action::Submit(command),
            provides,
        }
    }

    fn skip(command: Command, reason: String) -> Self {
        Job {
            key: command.key(),
            action: Action::Skip {
                command: Some(command),
                reason,
            },
            provides: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Created,
    AlreadyExists,
    Failed(String),
    Skipped(String),
}

struct Planner<'a> {
    analysis: &'a AnalysisResult,
    map: &'a RegistrarIdMap,
    committed: &'a Committed,
}

fn plan_registrars(p: &Planner<'_>) -> Vec<Job> {
    p.map
        .iter()
        .map(|(source, target)| Job {
            key: source.to_string(),
            action: Action::VerifyRegistrar {
                target: target.to_string(),
            },
            provides: None,
        })
        .collect()
}

fn plan_contacts(p: &Planner<'_>) -> Vec<Job> {
    p.analysis
        .contacts
        .iter()
        .map(|c| Job::submit(Command::Contact(c.clone()), Some(Provides::Contact(c.id.clone()))))
        .collect()
}

fn plan_nndns(p: &Planner<'_>) -> Vec<Job> {
    p.analysis
        .nndns
        .iter()
        .map(|n| Job::submit(Command::Nndn(n.clone()), None))
        .collect()
}

fn plan_hosts(p: &Planner<'_>) -> Vec<Job> {
    p.analysis
        .hosts
        .iter()
        .map(|h| Job::submit(Command::Host(h.clone()), Some(Provides::Host(h.key()))))
        .collect()
}

/// Domains go out without delegation; a domain whose contacts were not
/// committed is skipped.
fn plan_domains(p: &Planner<'_>) -> Vec<Job> {
    p.analysis
        .domains
        .iter()
        .map(|d| {
            let command = Command::Domain(d.without_delegation());
            let missing: Vec<&str> = d
                .registrant
                .iter()
                .map(String::as_str)
                .chain(d.contacts.iter().map(|c| c.id.as_str()))
                .filter(|id| !p.committed.contacts.contains(*id))
                .collect();
            if missing.is_empty() {
                Job::submit(command, Some(Provides::Domain(d.name.clone())))
            } else {
                Job::skip(
                    command,
                    format!("missing dependency: contact(s) {}", missing.join(", ")),
                )
            }
        })
        .collect()
}

fn plan_links(p: &Planner<'_>) -> Vec<Job> {
    let mut jobs = Vec::new();
    for d in &p.analysis.domains {
        for link in &d.host_links {
            let command = Command::LinkHost(LinkCommand {
                domain: d.name.clone(),
                host_name: link.host_name.clone(),
                sponsor: link.sponsor.clone(),
            });
            let host = HostKey {
                name: link.host_name.clone(),
                sponsor: link.sponsor.clone(),
            };
            if !p.committed.domains.contains(&d.name) {
                jobs.push(Job::skip(command, format!("missing dependency: domain {}", d.name)));
            } else if !p.committed.hosts.contains(&host) {
                jobs.push(Job::skip(command, format!("missing dependency: host {host}")));
            } else {
                jobs.push(Job::submit(command, None));
            }
        }
    }
    jobs
}

// ── Orchestrator ──

pub struct Importer<'a, A: RegistryApi> {
    api: &'a A,
    config: &'a ImportConfig,
}

impl<'a, A: RegistryApi> Importer<'a, A> {
    pub fn new(api: &'a A, config: &'a ImportConfig) -> Self {
        Self { api, config }
    }

    /// Run every stage. The log is persisted after each stage and on every
    /// exit path; only conditions that make the whole run meaningless
    /// return an error.
    pub async fn run(
        &self,
        analysis: &AnalysisResult,
        overrides: Option<&RegistrarOverrides>,
        log: &mut ImportLog,
    ) -> Result<Counters, ImportError> {
        match self.run_stages(analysis, overrides, log).await {
            Ok(()) => {
                log.finish()?;
                let totals = log.result().totals();
                info!(
                    created = totals.created,
                    already_exists = totals.already_exists,
                    failed = totals.failed,
                    skipped = totals.skipped,
                    "import finished"
                );
                Ok(totals)
            }
            Err(e) => {
                warn!(error = %e, "import aborted");
                log.abort(e.to_string())?;
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        analysis: &AnalysisResult,
        overrides: Option<&RegistrarOverrides>,
        log: &mut ImportLog,
    ) -> Result<(), ImportError> {
        let tld = &analysis.header.tld;
        match self.api.tld(tld).await {
            Ok(info) => info!(tld = %info.name, state = ?info.state, "target TLD present"),
            Err(ApiError::NotFound(_)) => return Err(ImportError::MissingTld(tld.clone())),
            Err(e) => return Err(e.into()),
        }

        let mut map = analysis.registrar_map.clone();
        if let Some(overrides) = overrides {
            let added = map.apply_overrides(overrides)?;
            info!(added, "applied import-time registrar overrides");
        }

        let unmapped = analysis.unmapped_references(&map);
        if !unmapped.is_empty() {
            if !self.config.tolerate_unmapped {
                return Err(ImportError::UnmappedRegistrars {
                    count: unmapped.len(),
                });
            }
            warn!(
                count = unmapped.len(),
                "commands with unmapped registrars will be skipped"
            );
        }

        let mut committed = Committed::default();
        for descriptor in &STAGES {
            let stage = descriptor.stage;
            let started_at = Utc::now();

            if !(descriptor.enabled)(&analysis.header.counts) {
                info!(stage = %stage, "header declares nothing for stage, skipping");
                log.record_stage(StageReport {
                    name: stage.name().to_string(),
                    status: StageStatus::Skipped,
                    started_at,
                    finished_at: Utc::now(),
                    counters: Counters::default(),
                })?;
                continue;
            }

            let jobs = (descriptor.plan)(&Planner {
                analysis,
                map: &map,
                committed: &committed,
            });
            info!(stage = %stage, jobs = jobs.len(), "stage started");

            let results = self.execute(&jobs, &map).await;

            let mut counters = Counters::default();
            for (job, outcome) in jobs.iter().zip(results) {
                if !matches!(job.action, Action::Skip { .. }) {
                    counters.submitted += 1;
                }
                match outcome {
                    Outcome::Created => counters.created += 1,
                    Outcome::AlreadyExists => {
                        warn!(stage = %stage, key = %job.key, "already exists in target");
                        counters.already_exists += 1;
                    }
                    Outcome::Failed(error) => {
                        warn!(stage = %stage, key = %job.key, error = %error, "command failed");
                        counters.failed += 1;
                        log.record_failure(failure(stage, job, error));
                        continue;
                    }
                    Outcome::Skipped(reason) => {
                        warn!(stage = %stage, key = %job.key, reason = %reason, "command skipped");
                        counters.skipped += 1;
                        log.record_failure(failure(stage, job, reason));
                        continue;
                    }
                }
                match &job.provides {
                    Some(Provides::Contact(id)) => {
                        committed.contacts.insert(id.clone());
                    }
                    Some(Provides::Host(key)) => {
                        committed.hosts.insert(key.clone());
                    }
                    Some(Provides::Domain(name)) => {
                        committed.domains.insert(name.clone());
                    }
                    None => {}
                }
            }

            info!(
                stage = %stage,
                created = counters.created,
                already_exists = counters.already_exists,
                failed = counters.failed,
                skipped = counters.skipped,
                "stage complete"
            );
            log.record_stage(StageReport {
                name: stage.name().to_string(),
                status: StageStatus::Completed,
                started_at,
                finished_at: Utc::now(),
                counters,
            })?;
        }
        Ok(())
    }

    /// Run `jobs` through the worker pool; outcomes come back in job order.
    async fn execute(&self, jobs: &[Job], map: &RegistrarIdMap) -> Vec<Outcome> {
        let chunks = Chunks::new(jobs, self.config.chunk_size);
        let total = chunks.count_total();

        let mut done: Vec<(usize, Vec<Outcome>)> = stream::iter(chunks.enumerate())
            .map(|(index, (chunk, has_more))| async move {
                debug!(chunk = index + 1, of = total, has_more, "dispatching chunk");
                let mut outcomes = Vec::with_capacity(chunk.len());
                for job in chunk {
                    outcomes.push(self.execute_one(job, map).await);
                }
                (index, outcomes)
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        done.sort_by_key(|(index, _)| *index);
        done.into_iter().flat_map(|(_, outcomes)| outcomes).collect()
    }

    async fn execute_one(&self, job: &Job, map: &RegistrarIdMap) -> Outcome {
        match &job.action {
            Action::Skip { reason, .. } => Outcome::Skipped(reason.clone()),
            Action::VerifyRegistrar { target } => match self.api.registrar(target).await {
                Ok(()) => Outcome::AlreadyExists,
                Err(ApiError::NotFound(_)) => {
                    Outcome::Failed(format!("target registrar {target} not found"))
                }
                Err(e) => Outcome::Failed(e.to_string()),
            },
            Action::Submit(command) => {
                let remapped = match command.remap_registrars(map) {
                    Ok(c) => c,
                    Err(e) => return Outcome::Skipped(e.to_string()),
                };
                match self.api.submit(&remapped).await {
                    Ok(()) => Outcome::Created,
                    Err(ApiError::AlreadyExists(_)) => Outcome::AlreadyExists,
                    Err(e) => Outcome::Failed(e.to_string()),
                }
            }
        }
    }
}

fn failure(stage: Stage, job: &Job, error: String) -> FailureRecord {
    let command = match &job.action {
        Action::Submit(c) => Some(c.clone()),
        Action::Skip { command, .. } => command.clone(),
        Action::VerifyRegistrar { .. } => None,
    };
    FailureRecord {
        stage: stage.name().to_string(),
        key: job.key.clone(),
        command,
        error,
        at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rdekit_core::command::{
        ContactCommand, DomainCommand, HostCommand, HostLink, PostalInfo, PostalKind,
    };
    use rdekit_core::status::Status;
    use rdekit_core::{DepositHeader, IdMode, TargetRegistrar};
    use rdekit_store::{Outcome as LogOutcome, SourceInfo};
    use tempfile::TempDir;

    use crate::api::TldInfo;

    #[derive(Default)]
    struct FakeApi {
        tlds: Vec<String>,
        registrars: Vec<String>,
        existing: Mutex<HashSet<String>>,
        reject: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn new() -> Self {
            FakeApi {
                tlds: vec!["tld".into()],
                registrars: vec!["target-a".into(), "target-b".into()],
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn call_name(command: &Command) -> String {
        let kind = match command {
            Command::Contact(_) => "contact",
            Command::Host(_) => "host",
            Command::Domain(_) => "domain",
            Command::Nndn(_) => "nndn",
            Command::LinkHost(_) => "link",
        };
        format!("{kind}:{}", command.key())
    }

    #[async_trait]
    impl RegistryApi for FakeApi {
        async fn tld(&self, name: &str) -> Result<TldInfo, ApiError> {
            if self.tlds.iter().any(|t| t == name) {
                Ok(TldInfo {
                    name: name.into(),
                    state: None,
                })
            } else {
                Err(ApiError::NotFound(name.into()))
            }
        }

        async fn list_registrars(&self) -> Result<Vec<TargetRegistrar>, ApiError> {
            Ok(Vec::new())
        }

        async fn registrar(&self, client_id: &str) -> Result<(), ApiError> {
            if self.registrars.iter().any(|r| r == client_id) {
                Ok(())
            } else {
                Err(ApiError::NotFound(client_id.into()))
            }
        }

        async fn submit(&self, command: &Command) -> Result<(), ApiError> {
            let name = call_name(command);
            self.calls.lock().unwrap().push(name.clone());
            if self.reject.contains(&name) {
                return Err(ApiError::Server {
                    status: 422,
                    body: "rejected".into(),
                });
            }
            if !self.existing.lock().unwrap().insert(name.clone()) {
                return Err(ApiError::AlreadyExists(name));
            }
            Ok(())
        }
    }

    fn contact(id: &str, sponsor: &str) -> ContactCommand {
        ContactCommand {
            id: id.into(),
            resource_id: None,
            statuses: vec![Status::Ok],
            postal_info: vec![PostalInfo {
                kind: PostalKind::Int,
                name: "Someone".into(),
                org: None,
                street: vec![],
                city: "Town".into(),
                sp: None,
                pc: None,
                cc: "US".into(),
            }],
            voice: None,
            fax: None,
            email: "someone@example.com".into(),
            sponsor: sponsor.into(),
            creator: None,
            created_at: None,
            updater: None,
            updated_at: None,
        }
    }

    fn host(name: &str, sponsor: &str, duplicate_of: Option<&str>) -> HostCommand {
        HostCommand {
            name: name.into(),
            resource_id: None,
            statuses: vec![Status::Ok],
            addresses: vec![],
            sponsor: sponsor.into(),
            creator: None,
            created_at: None,
            updater: None,
            updated_at: None,
            duplicate_of: duplicate_of.map(str::to_string),
        }
    }

    fn domain(name: &str, sponsor: &str, registrant: &str, ns: &str) -> DomainCommand {
        DomainCommand {
            name: name.into(),
            resource_id: None,
            u_name: None,
            idn_table: None,
            statuses: vec![Status::Ok],
            registrant: Some(registrant.into()),
            contacts: vec![],
            nameservers: vec![ns.into()],
            host_links: vec![HostLink {
                host_name: ns.into(),
                sponsor: sponsor.into(),
            }],
            sponsor: sponsor.into(),
            creator: None,
            created_at: None,
            expires_at: None,
            updater: None,
            updated_at: None,
        }
    }

    fn single_domain_analysis() -> AnalysisResult {
        let mut map = RegistrarIdMap::new();
        map.insert("RAR-A", "target-a").unwrap();
        AnalysisResult {
            header: DepositHeader {
                tld: "tld".into(),
                counts: EntityCounts {
                    registrars: 1,
                    contacts: 1,
                    hosts: 1,
                    domains: 1,
                    ..Default::default()
                },
                ..Default::default()
            },
            deposit_counts: EntityCounts::default(),
            id_mode: IdMode::Generate,
            registrar_map: map,
            contacts: vec![contact("C-A", "RAR-A")],
            hosts: vec![host("ns1.example.tld", "RAR-A", None)],
            domains: vec![domain("example.tld", "RAR-A", "C-A", "ns1.example.tld")],
            nndns: vec![],
            diagnostics: vec![],
        }
    }

    fn two_sponsor_analysis() -> AnalysisResult {
        let mut analysis = single_domain_analysis();
        analysis.registrar_map.insert("RAR-B", "target-b").unwrap();
        analysis.header.counts.registrars = 2;
        analysis.header.counts.contacts = 2;
        analysis.header.counts.domains = 2;
        analysis.contacts.push(contact("C-B", "RAR-B"));
        analysis
            .hosts
            .push(host("ns1.example.tld", "RAR-B", Some("RAR-A")));
        analysis
            .domains
            .push(domain("other.tld", "RAR-B", "C-B", "ns1.example.tld"));
        analysis
    }

    fn new_log(dir: &TempDir) -> ImportLog {
        let source = SourceInfo {
            file_name: "tld.xml".into(),
            size_bytes: 1,
        };
        ImportLog::create(&dir.path().join("tld.xml.import.json"), source, "tld").unwrap()
    }

    #[tokio::test]
    async fn host_is_committed_before_domain() {
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);
        let api = FakeApi::new();
        let config = ImportConfig::default();

        let totals = Importer::new(&api, &config)
            .run(&single_domain_analysis(), None, &mut log)
            .await
            .unwrap();

        assert_eq!(
            api.calls(),
            vec![
                "contact:C-A",
                "host:ns1.example.tld@target-a",
                "domain:example.tld",
                "link:example.tld -> ns1.example.tld@target-a",
            ]
        );
        assert_eq!(totals.failed, 0);

        let result = ImportLog::load(log.path()).unwrap();
        assert_eq!(result.outcome, LogOutcome::Completed);
        let names: Vec<&str> = result.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["registrars", "contacts", "nndn", "hosts", "domains", "link_hosts_to_domains"]
        );
        assert_eq!(result.stage("nndn").unwrap().status, StageStatus::Skipped);
        assert_eq!(result.stage("registrars").unwrap().counters.already_exists, 1);
    }

    #[tokio::test]
    async fn each_domain_links_to_its_sponsors_copy() {
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);
        let api = FakeApi::new();
        let config = ImportConfig::default();

        Importer::new(&api, &config)
            .run(&two_sponsor_analysis(), None, &mut log)
            .await
            .unwrap();

        let calls = api.calls();
        assert!(calls.contains(&"host:ns1.example.tld@target-a".to_string()));
        assert!(calls.contains(&"host:ns1.example.tld@target-b".to_string()));
        assert!(calls.contains(&"link:example.tld -> ns1.example.tld@target-a".to_string()));
        assert!(calls.contains(&"link:other.tld -> ns1.example.tld@target-b".to_string()));
        assert!(log.result().failures.is_empty());
    }

    #[tokio::test]
    async fn rerun_reports_already_exists_not_failures() {
        let dir = TempDir::new().unwrap();
        let api = FakeApi::new();
        let config = ImportConfig::default();
        let analysis = two_sponsor_analysis();

        let mut first = new_log(&dir);
        Importer::new(&api, &config)
            .run(&analysis, None, &mut first)
            .await
            .unwrap();

        let mut second = new_log(&dir);
        let totals = Importer::new(&api, &config)
            .run(&analysis, None, &mut second)
            .await
            .unwrap();

        let contacts = second.result().stage("contacts").unwrap().counters;
        assert_eq!(contacts.already_exists, 2);
        assert_eq!(contacts.failed, 0);
        assert_eq!(totals.failed, 0);
        assert_eq!(totals.skipped, 0);
        assert_eq!(second.result().stage("domains").unwrap().counters.committed(), 2);
    }

    #[tokio::test]
    async fn domain_with_uncommitted_contact_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);
        let mut api = FakeApi::new();
        api.reject.insert("contact:C-B".into());
        let config = ImportConfig::default();

        let totals = Importer::new(&api, &config)
            .run(&two_sponsor_analysis(), None, &mut log)
            .await
            .unwrap();

        assert!(!api.calls().contains(&"domain:other.tld".to_string()));
        assert!(api.calls().contains(&"domain:example.tld".to_string()));
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.skipped, 2);

        let failures = &log.result().failures;
        let stages: Vec<&str> = failures.iter().map(|f| f.stage.as_str()).collect();
        assert_eq!(stages, vec!["contacts", "domains", "link_hosts_to_domains"]);
        assert!(failures[1].error.starts_with("missing dependency"));
        assert!(matches!(failures[1].command, Some(Command::Domain(_))));
    }

    #[tokio::test]
    async fn missing_tld_aborts_but_writes_log() {
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);
        let api = FakeApi {
            tlds: vec![],
            ..FakeApi::new()
        };
        let config = ImportConfig::default();

        let err = Importer::new(&api, &config)
            .run(&single_domain_analysis(), None, &mut log)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingTld(t) if t == "tld"));
        assert!(api.calls().is_empty());

        let on_disk = ImportLog::load(log.path()).unwrap();
        assert!(matches!(on_disk.outcome, LogOutcome::Aborted { .. }));
    }

    #[tokio::test]
    async fn unmapped_registrars_refused_unless_tolerated() {
        let mut analysis = two_sponsor_analysis();
        analysis.registrar_map = {
            let mut map = RegistrarIdMap::new();
            map.insert("RAR-A", "target-a").unwrap();
            map
        };
        let api = FakeApi::new();
        let dir = TempDir::new().unwrap();

        let strict = ImportConfig::default();
        let mut log = new_log(&dir);
        let err = Importer::new(&api, &strict)
            .run(&analysis, None, &mut log)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::UnmappedRegistrars { count: 3 }));

        let tolerant = ImportConfig {
            tolerate_unmapped: true,
            ..ImportConfig::default()
        };
        let mut log = new_log(&dir);
        let totals = Importer::new(&api, &tolerant)
            .run(&analysis, None, &mut log)
            .await
            .unwrap();
        assert_eq!(totals.created, 4);
        assert!(totals.skipped >= 3);
        assert!(!api.calls().iter().any(|c| c.contains("target-b") || c.contains("RAR-B")));
    }

    #[tokio::test]
    async fn import_time_overrides_fill_the_map() {
        let mut analysis = two_sponsor_analysis();
        let mut map = RegistrarIdMap::new();
        map.insert("RAR-A", "target-a").unwrap();
        analysis.registrar_map = map;

        let overrides = RegistrarOverrides([("RAR-B".to_string(), "target-b".to_string())].into());
        let api = FakeApi::new();
        let config = ImportConfig::default();
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);

        let totals = Importer::new(&api, &config)
            .run(&analysis, Some(&overrides), &mut log)
            .await
            .unwrap();
        assert_eq!(totals.failed + totals.skipped, 0);
    }

    #[tokio::test]
    async fn many_chunks_many_workers_keep_every_command() {
        let mut analysis = single_domain_analysis();
        analysis.contacts = (0..25).map(|i| contact(&format!("C-{i:03}"), "RAR-A")).collect();
        analysis.domains.clear();
        analysis.header.counts.contacts = 25;
        analysis.header.counts.domains = 0;

        let api = FakeApi::new();
        let config = ImportConfig {
            workers: 3,
            chunk_size: 4,
            tolerate_unmapped: false,
        };
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);

        Importer::new(&api, &config)
            .run(&analysis, None, &mut log)
            .await
            .unwrap();

        let contacts = log.result().stage("contacts").unwrap().counters;
        assert_eq!(contacts.submitted, 25);
        assert_eq!(contacts.created, 25);
        assert_eq!(
            log.result().stage("link_hosts_to_domains").unwrap().status,
            StageStatus::Skipped
        );
    }

    #[test]
    fn stage_order_is_fixed() {
        let names: Vec<&str> = stage_order().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["registrars", "contacts", "nndn", "hosts", "domains", "link_hosts_to_domains"]
        );
    }
}
