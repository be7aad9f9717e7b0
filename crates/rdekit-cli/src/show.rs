use std::path::Path;

use anyhow::{Context, Result};
use rdekit_store::AnalysisArtifact;

use crate::display;

pub fn run(path: &Path) -> Result<()> {
    let artifact = AnalysisArtifact::load(path)
        .with_context(|| format!("loading analysis artifact {}", path.display()))?;
    display::print_analysis(&artifact);
    Ok(())
}
