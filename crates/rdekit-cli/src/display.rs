//! Plain-text summaries for analysis artifacts and import results.

use std::collections::BTreeMap;

use rdekit_core::{Diagnostic, EntityKind};
use rdekit_store::{AnalysisArtifact, ImportResult, Outcome, StageStatus};

/// Diagnostics listed per type before the rest are elided.
const MAX_DIAGNOSTICS_PER_TYPE: usize = 10;

// ── Analysis ──

pub fn print_analysis(artifact: &AnalysisArtifact) {
    let result = &artifact.result;
    let header = &result.header;

    println!("=== {} ===", artifact.source.file_name);
    println!(
        "TLD {}  ({} bytes, analysed {})",
        header.tld,
        artifact.source.size_bytes,
        artifact.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(watermark) = &header.watermark {
        println!("Watermark {watermark}");
    }
    println!();

    let commands = result.command_counts();
    println!("--- Counts ---");
    println!("  {:<12} {:>10} {:>10} {:>10}", "", "declared", "found", "commands");
    for kind in EntityKind::ALL {
        let found = result.deposit_counts.get(kind);
        println!(
            "  {:<12} {:>10} {:>10} {:>10}{}",
            kind.as_str(),
            header.counts.get(kind),
            found,
            count_cell(kind, commands.get(kind)),
            mismatch_marker(header.counts.get(kind), found)
        );
    }
    println!(
        "  registrar map: {} mapped, id mode {:?}",
        result.registrar_map.len(),
        result.id_mode
    );
    println!();

    print_diagnostics(&result.diagnostics);
}

fn count_cell(kind: EntityKind, value: u64) -> String {
    match kind {
        EntityKind::IdnTable => "-".to_string(),
        _ => value.to_string(),
    }
}

fn mismatch_marker(declared: u64, found: u64) -> &'static str {
    if declared == found { "" } else { "  !" }
}

pub(crate) fn group_diagnostics(diagnostics: &[Diagnostic]) -> BTreeMap<&'static str, Vec<&Diagnostic>> {
    let mut groups: BTreeMap<&'static str, Vec<&Diagnostic>> = BTreeMap::new();
    for d in diagnostics {
        groups.entry(d.type_name()).or_default().push(d);
    }
    groups
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        println!("--- Diagnostics: none ---");
        return;
    }
    println!("--- Diagnostics ({}) ---", diagnostics.len());
    for (type_name, items) in group_diagnostics(diagnostics) {
        println!("  {type_name} ({})", items.len());
        for d in items.iter().take(MAX_DIAGNOSTICS_PER_TYPE) {
            println!("    {d}");
        }
        if items.len() > MAX_DIAGNOSTICS_PER_TYPE {
            println!("    ... ({} more)", items.len() - MAX_DIAGNOSTICS_PER_TYPE);
        }
    }
}

// ── Import ──

pub fn print_import(result: &ImportResult) {
    println!("=== import {} ({}) ===", result.source.file_name, result.tld);
    match &result.outcome {
        Outcome::Completed => println!("Outcome: completed"),
        Outcome::InProgress => println!("Outcome: in progress"),
        Outcome::Aborted { reason } => println!("Outcome: aborted ({reason})"),
    }
    println!();

    println!(
        "  {:<22} {:>9} {:>8} {:>8} {:>7} {:>8}",
        "stage", "submitted", "created", "exists", "failed", "skipped"
    );
    for stage in &result.stages {
        let c = &stage.counters;
        match stage.status {
            StageStatus::Skipped => println!("  {:<22} (nothing to do)", stage.name),
            StageStatus::Completed => println!(
                "  {:<22} {:>9} {:>8} {:>8} {:>7} {:>8}",
                stage.name, c.submitted, c.created, c.already_exists, c.failed, c.skipped
            ),
        }
    }

    if !result.failures.is_empty() {
        println!();
        println!("--- Failures ({}) ---", result.failures.len());
        for f in result.failures.iter().take(MAX_DIAGNOSTICS_PER_TYPE) {
            println!("  [{}] {}: {}", f.stage, f.key, f.error);
        }
        if result.failures.len() > MAX_DIAGNOSTICS_PER_TYPE {
            println!(
                "  ... ({} more in the result log)",
                result.failures.len() - MAX_DIAGNOSTICS_PER_TYPE
            );
        }
    }
}
