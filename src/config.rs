use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::extract::FederationMap;
use crate::model::validation::ValidationCache;
use crate::parsers;
use crate::parsers::metadata_tree::Element;

/// Everything loaded from disk before analysis starts.
pub struct LoadedInputs {
    pub metadata_path: PathBuf,
    pub metadata: Element,
    pub federations: Option<FederationMap>,
}

pub fn load(metadata_path: &Path, federations_path: Option<&Path>) -> Result<LoadedInputs> {
    let metadata = parsers::metadata_tree::parse_file(metadata_path)?;
    let federations = federations_path.map(load_federation_map).transpose()?;

    tracing::debug!(
        path = %metadata_path.display(),
        federations = federations.as_ref().map_or(0, |m| m.len()),
        "inputs loaded"
    );

    Ok(LoadedInputs {
        metadata_path: metadata_path.to_path_buf(),
        metadata,
        federations,
    })
}

/// JSON object mapping registrationAuthority to a display name.
pub fn load_federation_map(path: &Path) -> Result<FederationMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid federation map in {}", path.display()))
}

/// A missing cache file is an empty cache.
pub fn load_cache(path: &Path) -> Result<ValidationCache> {
    if !path.exists() {
        return Ok(ValidationCache::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid validation cache in {}", path.display()))
}

pub fn save_cache(path: &Path, cache: &ValidationCache) -> Result<()> {
    let json = serde_json::to_string_pretty(cache)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), entries = cache.len(), "validation cache saved");
    Ok(())
}
