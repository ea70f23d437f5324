// src/manifest/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::Result;
use crate::manifest::model::Manifest;
use crate::manifest::validate::validate_manifest;

/// Load a manifest from disk without semantic validation.
///
/// `.toml` files are parsed as TOML; everything else as YAML.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let manifest = parse_manifest(&contents, is_toml(path))?;
    debug!(
        path = %path.display(),
        components = manifest.components.len(),
        "manifest parsed"
    );
    Ok(manifest)
}

/// Load a manifest and run [`validate_manifest`] on it.
///
/// This is the entry point the CLI uses: any structural problem, duplicate
/// id, unknown dependency or cycle is reported before anything runs.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manifest> {
    let manifest = load_from_path(&path)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

/// Parse manifest text in either supported format.
pub fn parse_manifest(contents: &str, toml_format: bool) -> Result<Manifest> {
    if toml_format {
        Ok(toml::from_str(contents)?)
    } else {
        Ok(serde_yaml::from_str(contents)?)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}
