use std::path::Path;

use super::constraint::{coerce_version, VersionConstraint};
use super::environment::EnvironmentProbe;
use super::manifest::parse_manifest;
use crate::config::EnvironmentConfig;
use crate::error::ManifestError;
use crate::model::{
    CompatibilityCheck, CompatibilityReport, ExtensionManifest, Platform, Requirements, SystemInfo,
};

type CurrentVersion = fn(&dyn EnvironmentProbe) -> Option<String>;

/// Evaluates declared version constraints against an [`EnvironmentProbe`].
///
/// The checker holds no state between calls; every report is computed from
/// scratch.
pub struct CompatibilityChecker {
    env: Box<dyn EnvironmentProbe>,
    framework_package: String,
}

impl CompatibilityChecker {
    pub fn new(env: impl EnvironmentProbe + 'static) -> Self {
        Self {
            env: Box::new(env),
            framework_package: EnvironmentConfig::default().framework_package,
        }
    }

    pub fn with_framework_package(mut self, name: impl Into<String>) -> Self {
        self.framework_package = name.into();
        self
    }

    pub fn check_compatibility(&self, requirements: &Requirements) -> CompatibilityReport {
        let mut report = CompatibilityReport::new();

        // The environment is only probed for components that are constrained.
        let components: [(&str, &Option<String>, CurrentVersion); 3] = [
            ("platform", &requirements.platform, |env| env.platform_version()),
            ("framework", &requirements.framework, |env| env.framework_version()),
            ("runtime", &requirements.runtime, |env| env.runtime_version()),
        ];
        for (name, constraint, current) in components {
            if let Some(constraint) = constraint {
                let current = current(self.env.as_ref());
                report.record(check_component(name, constraint, current));
            }
        }

        if !requirements.dependencies.is_empty() {
            self.check_dependencies(requirements, &mut report);
        }

        report
    }

    fn check_dependencies(&self, requirements: &Requirements, report: &mut CompatibilityReport) {
        let installed = match self.env.installed_packages() {
            Ok(installed) => installed,
            Err(e) => {
                tracing::warn!(error = %e, "could not read installed packages");
                report.fail(format!("Unable to read installed packages: {}", e));
                return;
            }
        };

        for (package, required) in &requirements.dependencies {
            let current = installed.get(package).cloned();
            let Some(version) = current.as_deref() else {
                report.record(dependency_check(
                    package,
                    None,
                    required,
                    false,
                    format!("Package {} is not installed", package),
                ));
                continue;
            };

            let constraint = match VersionConstraint::parse(required) {
                Ok(c) => c,
                Err(e) => {
                    report.record(dependency_check(
                        package,
                        current.clone(),
                        required,
                        false,
                        format!("Invalid constraint for {}: {}", package, e),
                    ));
                    continue;
                }
            };

            match coerce_version(version) {
                Ok(installed_version) => {
                    let compatible = constraint.matches(&installed_version);
                    let message = if compatible {
                        format!("{} {} satisfies {}", package, version, required)
                    } else {
                        format!(
                            "{} {} is installed but {} is required",
                            package, version, required
                        )
                    };
                    report.record(dependency_check(
                        package,
                        current.clone(),
                        required,
                        compatible,
                        message,
                    ));
                }
                Err(_) => {
                    let message = format!(
                        "Cannot verify {} {} against {}",
                        package, version, required
                    );
                    report.warn(message.clone());
                    report.record(dependency_check(
                        package,
                        current.clone(),
                        required,
                        true,
                        message,
                    ));
                }
            }
        }
    }

    /// Reads the manifest at `path` (file or package directory).
    pub fn parse_manifest(&self, path: &Path) -> Result<ExtensionManifest, ManifestError> {
        parse_manifest(path)
    }

    /// Parses the manifest at `path` and checks everything it requires.
    pub fn validate_package_requirements(
        &self,
        path: &Path,
    ) -> Result<CompatibilityReport, ManifestError> {
        let manifest = parse_manifest(path)?;
        let requirements = manifest.requirements(&self.framework_package);
        Ok(self.check_compatibility(&requirements))
    }

    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            platform_version: self.env.platform_version(),
            framework_version: self.env.framework_version(),
            runtime_version: self.env.runtime_version(),
            os: Platform::current(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn check_component(name: &str, required: &str, current: Option<String>) -> CompatibilityCheck {
    let label = capitalize(name);
    let (compatible, message) = match (VersionConstraint::parse(required), current.as_deref()) {
        (Err(e), _) => (false, format!("Invalid {} version constraint: {}", name, e)),
        (Ok(_), None) => (
            false,
            format!("Unable to determine current {} version", name),
        ),
        (Ok(constraint), Some(version)) => match coerce_version(version) {
            Err(_) => (
                false,
                format!("Unable to parse current {} version '{}'", name, version),
            ),
            Ok(v) if constraint.matches(&v) => (
                true,
                format!("{} version {} satisfies {}", label, version, required),
            ),
            Ok(_) => (
                false,
                format!(
                    "{} version {} does not satisfy required {}",
                    label, version, required
                ),
            ),
        },
    };

    CompatibilityCheck {
        name: name.to_string(),
        package: None,
        current,
        required: required.to_string(),
        compatible,
        message,
    }
}

fn dependency_check(
    package: &str,
    current: Option<String>,
    required: &str,
    compatible: bool,
    message: String,
) -> CompatibilityCheck {
    CompatibilityCheck {
        name: "dependency".to_string(),
        package: Some(package.to_string()),
        current,
        required: required.to_string(),
        compatible,
        message,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::InstalledEnvironment;
    use std::collections::BTreeMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn checker() -> CompatibilityChecker {
        CompatibilityChecker::new(
            InstalledEnvironment::new(Some("2.4.0"), Some("10.48.4"), Some("8.2.12"))
                .with_packages([("guzzlehttp/guzzle", "7.8.1"), ("acme/dev", "dev-main")]),
        )
    }

    #[test]
    fn test_no_constraints_is_trivially_compatible() {
        let report = checker().check_compatibility(&Requirements::default());
        assert!(report.compatible);
        assert!(report.checks.is_empty());
        assert!(report.errors.is_empty());
    }

    /// Counts every question asked of the environment.
    #[derive(Clone, Default)]
    struct CountingProbe {
        calls: Arc<AtomicUsize>,
    }

    impl CountingProbe {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl EnvironmentProbe for CountingProbe {
        fn platform_version(&self) -> Option<String> {
            self.hit();
            Some("2.4.0".to_string())
        }

        fn framework_version(&self) -> Option<String> {
            self.hit();
            Some("10.48.4".to_string())
        }

        fn runtime_version(&self) -> Option<String> {
            self.hit();
            Some("8.2.12".to_string())
        }

        fn installed_packages(&self) -> Result<BTreeMap<String, String>, ManifestError> {
            self.hit();
            Ok(BTreeMap::new())
        }
    }

    #[test]
    fn test_no_constraints_does_not_probe_environment() {
        let probe = CountingProbe::default();
        let calls = probe.calls.clone();

        let report = CompatibilityChecker::new(probe).check_compatibility(&Requirements::default());

        assert!(report.compatible);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_only_constrained_components_are_probed() {
        let probe = CountingProbe::default();
        let calls = probe.calls.clone();
        let req = Requirements {
            runtime: Some("^8.1".to_string()),
            ..Default::default()
        };

        let report = CompatibilityChecker::new(probe).check_compatibility(&req);

        assert!(report.compatible);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_constraints_does_not_read_lock() {
        let env = InstalledEnvironment::new(None, None, None)
            .with_lock_file("/nonexistent/composer.lock");
        let report = CompatibilityChecker::new(env).check_compatibility(&Requirements::default());
        assert!(report.compatible);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unmet_platform_constraint() {
        let req = Requirements {
            platform: Some("^99.0".to_string()),
            ..Default::default()
        };
        let report = checker().check_compatibility(&req);

        assert!(!report.compatible);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(
            report.errors[0],
            "Platform version 2.4.0 does not satisfy required ^99.0"
        );
        assert_eq!(report.checks[0].current.as_deref(), Some("2.4.0"));
    }

    #[test]
    fn test_all_components_satisfied() {
        let req = Requirements {
            platform: Some(">=2.0".to_string()),
            framework: Some("^10.0".to_string()),
            runtime: Some("^8.1".to_string()),
            dependencies: BTreeMap::new(),
        };
        let report = checker().check_compatibility(&req);

        assert!(report.compatible, "{:?}", report.errors);
        assert_eq!(report.checks.len(), 3);
        assert!(report.checks.iter().all(|c| c.compatible));
    }

    #[test]
    fn test_unknown_current_version() {
        let env = InstalledEnvironment::new(None, None, None);
        let req = Requirements {
            runtime: Some("^8.1".to_string()),
            ..Default::default()
        };
        let report = CompatibilityChecker::new(env).check_compatibility(&req);

        assert!(!report.compatible);
        assert_eq!(report.errors[0], "Unable to determine current runtime version");
    }

    #[test]
    fn test_invalid_constraint_is_reported() {
        let req = Requirements {
            framework: Some("not-a-version".to_string()),
            ..Default::default()
        };
        let report = checker().check_compatibility(&req);
        assert!(!report.compatible);
        assert!(report.errors[0].starts_with("Invalid framework version constraint"));
    }

    #[test]
    fn test_missing_dependency() {
        let mut dependencies = BTreeMap::new();
        dependencies.insert("spatie/laravel-pdf".to_string(), "^1.0".to_string());
        let req = Requirements {
            dependencies,
            ..Default::default()
        };
        let report = checker().check_compatibility(&req);

        assert!(!report.compatible);
        assert!(report
            .errors
            .iter()
            .any(|e| e == "Package spatie/laravel-pdf is not installed"));
        assert_eq!(report.checks[0].package.as_deref(), Some("spatie/laravel-pdf"));
    }

    #[test]
    fn test_dependency_version_mismatch_and_unverifiable() {
        let mut dependencies = BTreeMap::new();
        dependencies.insert("guzzlehttp/guzzle".to_string(), "^6.0".to_string());
        dependencies.insert("acme/dev".to_string(), "^1.0".to_string());
        let req = Requirements {
            dependencies,
            ..Default::default()
        };
        let report = checker().check_compatibility(&req);

        assert!(!report.compatible);
        assert_eq!(
            report.errors,
            vec!["guzzlehttp/guzzle 7.8.1 is installed but ^6.0 is required".to_string()]
        );
        assert_eq!(report.warnings, vec!["Cannot verify acme/dev dev-main against ^1.0".to_string()]);
    }

    #[test]
    fn test_unreadable_lock_file() {
        let env = InstalledEnvironment::new(None, None, None)
            .with_lock_file("/nonexistent/composer.lock");
        let mut dependencies = BTreeMap::new();
        dependencies.insert("guzzlehttp/guzzle".to_string(), "^7.0".to_string());
        let req = Requirements {
            dependencies,
            ..Default::default()
        };
        let report = CompatibilityChecker::new(env).check_compatibility(&req);

        assert!(!report.compatible);
        assert!(report.errors[0].starts_with("Unable to read installed packages"));
    }

    #[test]
    fn test_validate_package_requirements() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("composer.json"),
            r#"{
                "name": "acme/maps",
                "require": {
                    "php": "^8.1",
                    "laravel/framework": "^10.0",
                    "guzzlehttp/guzzle": "^7.2",
                    "league/csv": "^9.0"
                }
            }"#,
        )
        .unwrap();

        let report = checker().validate_package_requirements(dir.path()).unwrap();
        assert!(!report.compatible);
        assert_eq!(report.errors, vec!["Package league/csv is not installed".to_string()]);
        assert_eq!(report.checks.len(), 4);
    }

    #[test]
    fn test_validate_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let err = checker()
            .validate_package_requirements(dir.path())
            .unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }

    #[test]
    fn test_system_info() {
        let info = checker().system_info();
        assert_eq!(info.platform_version.as_deref(), Some("2.4.0"));
        assert_eq!(info.framework_version.as_deref(), Some("10.48.4"));
        assert_eq!(info.runtime_version.as_deref(), Some("8.2.12"));
        assert_eq!(info.tool_version, env!("CARGO_PKG_VERSION"));
    }
}
