//! Mapping from escrow-source registrar ids to target client ids.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::raw::RawRegistrar;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("registrar {0:?} has no target mapping")]
    Unmapped(String),

    #[error("ambiguous registrar mapping for {source_id:?}: already mapped to {existing:?}, refusing {proposed:?}")]
    Ambiguous {
        source_id: String,
        existing: String,
        proposed: String,
    },

    #[error("target registrar {target:?} is already claimed by source {existing_source:?}, refusing {source_id:?}")]
    TargetClaimed {
        target: String,
        existing_source: String,
        source_id: String,
    },

    #[error("cannot read registrar overrides {path:?}: {source}")]
    OverrideIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid registrar overrides {path:?}: {source}")]
    OverrideFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A registrar known to the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRegistrar {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iana_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Bidirectional source-id → target client-id mapping.
///
/// A partial function: looking up an unmapped source id is an error, never
/// a default. Both directions are injective, so one target registrar can
/// never sponsor objects from two different source registrars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct RegistrarIdMap {
    forward: BTreeMap<String, String>,
    reverse: BTreeMap<String, String>,
}

impl RegistrarIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping. Returns `Ok(false)` when the identical mapping is
    /// already present; a different target for a known source (or a target
    /// already claimed by another source) is an error.
    pub fn insert(&mut self, source: &str, target: &str) -> Result<bool, MappingError> {
        if let Some(existing) = self.forward.get(source) {
            if existing == target {
                return Ok(false);
            }
            return Err(MappingError::Ambiguous {
                source_id: source.to_string(),
                existing: existing.clone(),
                proposed: target.to_string(),
            });
        }
        if let Some(existing_source) = self.reverse.get(target) {
            return Err(MappingError::TargetClaimed {
                target: target.to_string(),
                existing_source: existing_source.clone(),
                source_id: source.to_string(),
            });
        }
        self.forward.insert(source.to_string(), target.to_string());
        self.reverse.insert(target.to_string(), source.to_string());
        Ok(true)
    }

    pub fn lookup(&self, source: &str) -> Result<&str, MappingError> {
        self.forward
            .get(source)
            .map(String::as_str)
            .ok_or_else(|| MappingError::Unmapped(source.to_string()))
    }

    pub fn source_for(&self, target: &str) -> Option<&str> {
        self.reverse.get(target).map(String::as_str)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.forward.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// `(source, target)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    /// Apply operator overrides. Add-only and idempotent: re-applying the
    /// same overrides adds nothing. Returns the number of new mappings.
    pub fn apply_overrides(&mut self, overrides: &RegistrarOverrides) -> Result<usize, MappingError> {
        let mut added = 0;
        for (source, target) in &overrides.0 {
            if self.insert(source, target)? {
                debug!(source = %source, target = %target, "registrar override applied");
                added += 1;
            }
        }
        Ok(added)
    }
}

impl TryFrom<BTreeMap<String, String>> for RegistrarIdMap {
    type Error = MappingError;

    fn try_from(forward: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut map = RegistrarIdMap::new();
        for (source, target) in &forward {
            map.insert(source, target)?;
        }
        Ok(map)
    }
}

impl From<RegistrarIdMap> for BTreeMap<String, String> {
    fn from(map: RegistrarIdMap) -> Self {
        map.forward
    }
}

/// Operator-supplied `{ "<source id>": "<target client id>" }` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrarOverrides(pub BTreeMap<String, String>);

impl RegistrarOverrides {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path).map_err(|source| MappingError::OverrideIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| MappingError::OverrideFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A deposit registrar no resolution source could place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmappedRegistrar {
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source registrar that already holds the target this one resolved to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
}

/// Output of [`map_registrars`].
#[derive(Debug, Clone, Default)]
pub struct RegistrarMapping {
    pub map: RegistrarIdMap,
    pub unmapped: Vec<UnmappedRegistrar>,
}

/// Resolve each deposit registrar against the target directory, then layer
/// operator overrides on top.
///
/// Resolution per registrar: IANA id (`gurid`) match, then exact client-id
/// match. Registrars that resolve nowhere, or resolve to a target another
/// deposit registrar already holds, are reported, not fatal, so an analysis
/// can show the full scope of the problem before an operator writes an
/// override file. The only hard errors come from the overrides.
pub fn map_registrars(
    registrars: &[RawRegistrar],
    directory: &[TargetRegistrar],
    overrides: Option<&RegistrarOverrides>,
) -> Result<RegistrarMapping, MappingError> {
    let by_iana: BTreeMap<u64, &TargetRegistrar> = directory
        .iter()
        .filter_map(|t| t.iana_id.map(|id| (id, t)))
        .collect();

    let mut map = RegistrarIdMap::new();
    let mut pending: Vec<(&RawRegistrar, Option<String>)> = Vec::new();

    for raw in registrars {
        let by_gurid = raw
            .gurid
            .as_deref()
            .and_then(|g| g.trim().parse::<u64>().ok())
            .and_then(|g| by_iana.get(&g).copied());
        let resolved = by_gurid.or_else(|| directory.iter().find(|t| t.client_id == raw.id));

        let Some(target) = resolved else {
            pending.push((raw, None));
            continue;
        };
        match map.insert(&raw.id, &target.client_id) {
            Ok(_) => {}
            Err(MappingError::TargetClaimed {
                target,
                existing_source,
                ..
            }) => {
                warn!(
                    source_id = %raw.id,
                    target = %target,
                    claimed_by = %existing_source,
                    "registrar resolves to a target already claimed"
                );
                pending.push((raw, Some(existing_source)));
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(overrides) = overrides {
        let added = map.apply_overrides(overrides)?;
        info!(added, "applied registrar overrides");
    }

    let unmapped: Vec<UnmappedRegistrar> = pending
        .into_iter()
        .filter(|(raw, _)| !map.contains(&raw.id))
        .map(|(raw, claimed_by)| UnmappedRegistrar {
            source_id: raw.id.clone(),
            name: raw.name.clone(),
            claimed_by,
        })
        .collect();

    for u in &unmapped {
        warn!(source_id = %u.source_id, "registrar could not be mapped");
    }
    info!(mapped = map.len(), unmapped = unmapped.len(), "registrar mapping complete");

    Ok(RegistrarMapping { map, unmapped })
}
