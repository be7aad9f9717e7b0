//! `rdekit analyze`: deposit → analysis artifact + contact ids side file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rdekit_core::{
    AnalyzeConfig, ApiConfig, IdMode, RegistrarOverrides, TargetRegistrar, analyze,
    parse_deposit_file,
};
use rdekit_store::{
    AnalysisArtifact, ContactIdsArtifact, SourceInfo, default_analysis_path, default_contacts_path,
};
use rdekit_sync::{RegistryApi, RegistryClient};
use tracing::{info, warn};

use crate::AnalyzeArgs;
use crate::display;

pub(crate) struct Written {
    pub artifact: AnalysisArtifact,
    pub analysis: PathBuf,
    pub contacts: PathBuf,
}

pub async fn run(args: AnalyzeArgs) -> Result<()> {
    let written = write_artifacts(&args).await?;
    display::print_analysis(&written.artifact);
    println!();
    println!("  Analysis:    {}", written.analysis.display());
    println!("  Contact ids: {}", written.contacts.display());
    Ok(())
}

pub(crate) async fn write_artifacts(args: &AnalyzeArgs) -> Result<Written> {
    let deposit = parse_deposit_file(&args.file)
        .with_context(|| format!("parsing deposit {}", args.file.display()))?;

    let directory: Vec<TargetRegistrar> = match &args.api_url {
        Some(url) => {
            let client = RegistryClient::new(&ApiConfig::new(url.as_str()))?;
            client
                .list_registrars()
                .await
                .context("fetching target registrar directory")?
        }
        None => {
            warn!("no target API configured; registrars resolve through overrides only");
            Vec::new()
        }
    };

    let overrides = args
        .mapping
        .as_deref()
        .map(RegistrarOverrides::load)
        .transpose()?;

    let config = AnalyzeConfig {
        id_mode: if args.preserve_ids {
            IdMode::Preserve
        } else {
            IdMode::Generate
        },
    };
    let result = analyze(&deposit, &directory, overrides.as_ref(), &config)?;

    let source = SourceInfo::from_path(&args.file)?;
    let contact_ids = ContactIdsArtifact::new(source.clone(), result.referenced_contact_ids());
    let artifact = AnalysisArtifact::new(source, result);

    let analysis_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_analysis_path(&args.file));
    let contacts_path = default_contacts_path(&args.file);

    artifact
        .save(&analysis_path)
        .context("writing analysis artifact")?;
    contact_ids
        .save(&contacts_path)
        .context("writing contact ids artifact")?;

    info!(
        diagnostics = artifact.result.diagnostics.len(),
        path = %analysis_path.display(),
        "analysis written"
    );
    Ok(Written {
        artifact,
        analysis: analysis_path,
        contacts: contacts_path,
    })
}
