use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manifest key holding the runtime constraint.
pub const RUNTIME_PACKAGE: &str = "php";

/// `extra` key holding the host platform constraint.
pub const PLATFORM_EXTRA_KEY: &str = "platform-version";

/// The extension's declared metadata (composer.json layout).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionManifest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub require: BTreeMap<String, String>,
    #[serde(rename = "require-dev")]
    pub require_dev: BTreeMap<String, String>,
    pub scripts: BTreeMap<String, ScriptEntry>,
    pub extra: serde_json::Value,
}

/// A script entry is either a single command or a list of commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptEntry {
    Single(String),
    Many(Vec<String>),
}

impl ScriptEntry {
    pub fn commands(&self) -> Vec<&str> {
        match self {
            ScriptEntry::Single(cmd) => vec![cmd.as_str()],
            ScriptEntry::Many(cmds) => cmds.iter().map(String::as_str).collect(),
        }
    }
}

impl ExtensionManifest {
    /// Projects the manifest onto the constraints the compatibility checker
    /// evaluates.
    ///
    /// Platform extensions (`ext-*`, `lib-*`) and the runtime/framework
    /// entries are not treated as package dependencies.
    pub fn requirements(&self, framework_package: &str) -> Requirements {
        let platform = self
            .extra
            .get(PLATFORM_EXTRA_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let dependencies = self
            .require
            .iter()
            .filter(|(name, _)| {
                name.as_str() != RUNTIME_PACKAGE
                    && name.as_str() != framework_package
                    && !is_platform_package(name)
            })
            .map(|(name, constraint)| (name.clone(), constraint.clone()))
            .collect();

        Requirements {
            platform,
            framework: self.require.get(framework_package).cloned(),
            runtime: self.require.get(RUNTIME_PACKAGE).cloned(),
            dependencies,
        }
    }
}

fn is_platform_package(name: &str) -> bool {
    name.starts_with("ext-") || name.starts_with("lib-")
}

/// Version constraints an extension version declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl Requirements {
    pub fn is_empty(&self) -> bool {
        self.platform.is_none()
            && self.framework.is_none()
            && self.runtime.is_none()
            && self.dependencies.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Pending,
    Approved,
    Rejected,
}

/// A submitted version of an extension awaiting or past review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionVersion {
    pub id: String,
    pub extension_id: String,
    pub version: String,
    pub platform_version_constraint: Option<String>,
    pub framework_version_constraint: Option<String>,
    pub runtime_version_constraint: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    pub status: VersionStatus,
}

impl ExtensionVersion {
    pub fn requirements(&self) -> Requirements {
        Requirements {
            platform: self.platform_version_constraint.clone(),
            framework: self.framework_version_constraint.clone(),
            runtime: self.runtime_version_constraint.clone(),
            dependencies: self.dependencies.clone(),
        }
    }

    /// Approves a pending version. Returns false if the version was already
    /// reviewed.
    pub fn approve(&mut self) -> bool {
        self.review(VersionStatus::Approved)
    }

    /// Rejects a pending version. Returns false if the version was already
    /// reviewed.
    pub fn reject(&mut self) -> bool {
        self.review(VersionStatus::Rejected)
    }

    fn review(&mut self, outcome: VersionStatus) -> bool {
        if self.status != VersionStatus::Pending {
            return false;
        }
        self.status = outcome;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_projection() {
        let manifest: ExtensionManifest = serde_json::from_str(
            r#"{
                "name": "acme/crm-maps",
                "require": {
                    "php": "^8.1",
                    "laravel/framework": "^10.0",
                    "ext-json": "*",
                    "guzzlehttp/guzzle": "^7.2"
                },
                "extra": { "platform-version": ">=2.0" }
            }"#,
        )
        .unwrap();

        let req = manifest.requirements("laravel/framework");
        assert_eq!(req.runtime.as_deref(), Some("^8.1"));
        assert_eq!(req.framework.as_deref(), Some("^10.0"));
        assert_eq!(req.platform.as_deref(), Some(">=2.0"));
        assert_eq!(req.dependencies.len(), 1);
        assert_eq!(req.dependencies["guzzlehttp/guzzle"], "^7.2");
    }

    #[test]
    fn test_script_entries() {
        let manifest: ExtensionManifest = serde_json::from_str(
            r#"{"scripts": {"post-install-cmd": ["a", "b"], "test": "phpunit"}}"#,
        )
        .unwrap();

        assert_eq!(manifest.scripts["post-install-cmd"].commands(), vec!["a", "b"]);
        assert_eq!(manifest.scripts["test"].commands(), vec!["phpunit"]);
    }

    #[test]
    fn test_version_review_is_one_way() {
        let mut version = ExtensionVersion {
            id: "v1".to_string(),
            extension_id: "ext-1".to_string(),
            version: "1.0.0".to_string(),
            platform_version_constraint: None,
            framework_version_constraint: None,
            runtime_version_constraint: None,
            dependencies: BTreeMap::new(),
            status: VersionStatus::Pending,
        };

        assert!(version.approve());
        assert!(!version.reject());
        assert_eq!(version.status, VersionStatus::Approved);
    }
}
