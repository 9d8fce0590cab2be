use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use super::manifest::parse_lock_file;
use crate::config::EnvironmentConfig;
use crate::error::ManifestError;

/// Source of the versions an extension is checked against.
pub trait EnvironmentProbe: Send + Sync {
    fn platform_version(&self) -> Option<String>;

    fn framework_version(&self) -> Option<String>;

    fn runtime_version(&self) -> Option<String>;

    /// Installed packages keyed by name. Only consulted when an extension
    /// declares dependencies.
    fn installed_packages(&self) -> Result<BTreeMap<String, String>, ManifestError>;
}

#[derive(Debug, Clone)]
enum Installed {
    Unknown,
    LockFile(PathBuf),
    Known(BTreeMap<String, String>),
}

/// Environment described by configuration and an optional lock file.
#[derive(Debug, Clone)]
pub struct InstalledEnvironment {
    platform_version: Option<String>,
    framework_version: Option<String>,
    runtime_version: Option<String>,
    framework_package: String,
    installed: Installed,
}

impl InstalledEnvironment {
    pub fn new(
        platform_version: Option<&str>,
        framework_version: Option<&str>,
        runtime_version: Option<&str>,
    ) -> Self {
        Self {
            platform_version: platform_version.map(str::to_string),
            framework_version: framework_version.map(str::to_string),
            runtime_version: runtime_version.map(str::to_string),
            framework_package: EnvironmentConfig::default().framework_package,
            installed: Installed::Unknown,
        }
    }

    /// Builds the probe from configuration, asking the runtime binary for its
    /// version when none is configured.
    pub fn from_config(config: &EnvironmentConfig) -> Self {
        let runtime_version = config
            .runtime_version
            .clone()
            .or_else(detect_runtime_version);

        Self {
            platform_version: config.platform_version.clone(),
            framework_version: config.framework_version.clone(),
            runtime_version,
            framework_package: config.framework_package.clone(),
            installed: config
                .lock_file
                .clone()
                .map_or(Installed::Unknown, Installed::LockFile),
        }
    }

    pub fn with_lock_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.installed = Installed::LockFile(path.into());
        self
    }

    pub fn with_packages<I, K, V>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.installed = Installed::Known(
            packages
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn framework_package(&self) -> &str {
        &self.framework_package
    }
}

impl EnvironmentProbe for InstalledEnvironment {
    fn platform_version(&self) -> Option<String> {
        self.platform_version.clone()
    }

    fn framework_version(&self) -> Option<String> {
        if self.framework_version.is_some() {
            return self.framework_version.clone();
        }
        // Fall back to whatever the lock file pins for the framework package.
        self.installed_packages()
            .ok()
            .and_then(|mut pkgs| pkgs.remove(&self.framework_package))
    }

    fn runtime_version(&self) -> Option<String> {
        self.runtime_version.clone()
    }

    fn installed_packages(&self) -> Result<BTreeMap<String, String>, ManifestError> {
        match &self.installed {
            Installed::Unknown => Ok(BTreeMap::new()),
            Installed::LockFile(path) => parse_lock_file(path),
            Installed::Known(packages) => Ok(packages.clone()),
        }
    }
}

fn detect_runtime_version() -> Option<String> {
    let output = Command::new("php")
        .args(["-r", "echo PHP_VERSION;"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.is_empty() {
        None
    } else {
        tracing::debug!(version = %version, "detected runtime version");
        Some(version)
    }
}
