//! `rdekit import`: replay an analysis artifact into the target registry.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rdekit_core::xref::missing_contacts;
use rdekit_core::{
    ApiConfig, DepositHeader, ImportConfig, RegistrarOverrides, chunk_size, parse_header_only_file,
};
use rdekit_store::{
    AnalysisArtifact, ContactIdsArtifact, ImportLog, SourceInfo, default_contacts_path,
    default_import_log_path,
};
use rdekit_sync::{Importer, RegistryClient};
use tracing::{debug, warn};

use crate::ImportArgs;
use crate::display;

/// Only an unreadable deposit fails before the result log exists; every
/// later fatal condition is recorded in the log as an abort.
pub async fn run(args: ImportArgs) -> Result<()> {
    let header = parse_header_only_file(&args.file)
        .with_context(|| format!("reading deposit header {}", args.file.display()))?;

    let log_path = args
        .result
        .clone()
        .unwrap_or_else(|| default_import_log_path(&args.file));
    let mut log = ImportLog::create(&log_path, SourceInfo::from_path(&args.file)?, &header.tld)
        .context("creating import log")?;

    let prepared = match prepare(&args, &header) {
        Ok(prepared) => prepared,
        Err(e) => {
            log.abort(format!("{e:#}"))?;
            return Err(e.context(format!("import aborted; see {}", log_path.display())));
        }
    };
    let (artifact, overrides, client) = prepared;

    let config = ImportConfig {
        workers: args.workers.max(1),
        chunk_size: chunk_size(args.chunk_size),
        tolerate_unmapped: args.tolerate_unmapped,
    };

    let outcome = Importer::new(&client, &config)
        .run(&artifact.result, overrides.as_ref(), &mut log)
        .await;

    display::print_import(log.result());
    println!();
    println!("  Result log: {}", log_path.display());

    outcome.with_context(|| format!("import aborted; see {}", log_path.display()))?;
    Ok(())
}

fn prepare(
    args: &ImportArgs,
    header: &DepositHeader,
) -> Result<(AnalysisArtifact, Option<RegistrarOverrides>, RegistryClient)> {
    let artifact = AnalysisArtifact::load(&args.analysis)
        .with_context(|| format!("loading analysis artifact {}", args.analysis.display()))?;
    artifact.verify_source(&args.file, header)?;

    let missing = missing_referenced_contacts(&args.file, &artifact)?;
    if !missing.is_empty() {
        warn!(
            count = missing.len(),
            first = %missing[0],
            "referenced contacts absent from the analysis; dependent objects will be skipped"
        );
    }

    let overrides = args
        .mapping
        .as_deref()
        .map(RegistrarOverrides::load)
        .transpose()?;

    let api_config = ApiConfig {
        base_url: args.api_url.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        max_retries: args.retries,
        ..ApiConfig::default()
    };
    let client = RegistryClient::new(&api_config).context("building registry client")?;
    Ok((artifact, overrides, client))
}

/// Contact ids the deposit references but the analysis never extracted.
///
/// Reads the contact-ids side file written by `analyze`; when it is absent
/// or belongs to another deposit the ids are recomputed from the artifact.
pub(crate) fn missing_referenced_contacts(
    deposit: &Path,
    artifact: &AnalysisArtifact,
) -> Result<Vec<String>> {
    let path = default_contacts_path(deposit);
    let referenced = if path.exists() {
        let side = ContactIdsArtifact::load(&path)
            .with_context(|| format!("loading contact ids {}", path.display()))?;
        if side.source == artifact.source {
            side.ids()
        } else {
            warn!(path = %path.display(), "contact ids file belongs to another deposit; ignoring it");
            artifact.result.referenced_contact_ids()
        }
    } else {
        debug!(path = %path.display(), "no contact ids file; using the analysis");
        artifact.result.referenced_contact_ids()
    };
    Ok(missing_contacts(&referenced, &artifact.result.contacts))
}
