use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ManifestError;
use crate::model::ExtensionManifest;

/// Manifest file name looked up when a directory is given.
pub const DEFAULT_MANIFEST: &str = "composer.json";

/// Reads and parses an extension manifest.
///
/// `path` may point at the manifest itself or at the package directory
/// containing [`DEFAULT_MANIFEST`].
pub fn parse_manifest(path: &Path) -> Result<ExtensionManifest, ManifestError> {
    let path = resolve(path, DEFAULT_MANIFEST);
    let content = read(&path)?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Malformed { path, source })
}

#[derive(Deserialize)]
struct LockFile {
    #[serde(default)]
    packages: Vec<LockedPackage>,
    #[serde(default, rename = "packages-dev")]
    packages_dev: Vec<LockedPackage>,
}

#[derive(Deserialize)]
struct LockedPackage {
    name: String,
    version: String,
}

/// Reads installed package versions from a composer.lock style file.
pub fn parse_lock_file(path: &Path) -> Result<BTreeMap<String, String>, ManifestError> {
    let path = resolve(path, "composer.lock");
    let content = read(&path)?;
    let lock: LockFile = serde_json::from_str(&content)
        .map_err(|source| ManifestError::Malformed { path, source })?;

    Ok(lock
        .packages
        .into_iter()
        .chain(lock.packages_dev)
        .map(|p| (p.name, p.version))
        .collect())
}

fn resolve(path: &Path, file_name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(file_name)
    } else {
        path.to_path_buf()
    }
}

fn read(path: &Path) -> Result<String, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| ManifestError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}
