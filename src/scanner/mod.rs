//! Static security checks for extension packages.
//!
//! A package directory is loaded once into a [`PackageTree`] and then run
//! through every [`PackageCheck`]. Each check fills its own section of the
//! [`ScanBreakdown`]; the [`SecurityScanner`] folds the sections into a
//! single pass/fail [`ScanResult`].
//!
//! # Available Checks
//!
//! | Check | Blocking findings | Warnings |
//! |-------|-------------------|----------|
//! | [`StructureCheck`] | missing manifest, suspicious names, double extensions | server config files |
//! | [`DangerousFunctionCheck`] | `eval`, `exec`, `system`, ... | `unserialize`, `assert`, ... |
//! | [`VulnerabilityCheck`] | raw SQL with request input | hardcoded credentials |
//! | [`ManifestCheck`] | invalid manifest, suspicious scripts | lifecycle hooks, loose constraints |
//! | [`MalwareCheck`] | dropper signatures, encoded payloads | very long lines |
//!
//! # Example
//!
//! ```no_run
//! use extvet::scanner::{ScanRules, SecurityScanner};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let scanner = SecurityScanner::new(ScanRules::default())?;
//!     let result = scanner.scan(Path::new("./my-extension"))?;
//!     println!("{}", result.summary_line());
//!     Ok(())
//! }
//! ```

mod functions;
mod malware;
mod manifest;
mod rules;
mod structure;
mod tree;
mod vulnerabilities;

pub use functions::{scan_dangerous_functions, DangerousFunctionCheck};
pub use malware::{scan_malware_patterns, MalwareCheck};
pub use manifest::{validate_manifest, ManifestCheck};
pub use rules::{CompiledRules, ScanRules};
pub use structure::{validate_structure, StructureCheck};
pub use tree::{PackageFile, PackageTree, SourceFile};
pub use vulnerabilities::{scan_vulnerabilities, VulnerabilityCheck};

use std::path::Path;

use crate::error::ScanError;
use crate::model::{
    DangerousFunctionReport, MalwareReport, ManifestReport, ScanBreakdown, ScanResult,
    StructureReport, VulnerabilityReport,
};

/// One independent check over a loaded package.
pub trait PackageCheck: Send + Sync {
    /// Key of the section this check fills, as it appears in JSON output.
    fn name(&self) -> &'static str;

    /// Runs the check and stores its report in `scans`.
    fn run(&self, tree: &PackageTree, rules: &CompiledRules, scans: &mut ScanBreakdown);
}

/// Returns every check in the order their findings are reported.
///
/// ```
/// use extvet::scanner::all_checks;
///
/// let checks = all_checks();
/// assert_eq!(checks.len(), 5);
/// assert_eq!(checks[0].name(), "structure");
/// ```
pub fn all_checks() -> Vec<Box<dyn PackageCheck>> {
    vec![
        Box::new(StructureCheck),
        Box::new(DangerousFunctionCheck),
        Box::new(VulnerabilityCheck),
        Box::new(ManifestCheck),
        Box::new(MalwareCheck),
    ]
}

/// Runs the full check suite against package directories.
pub struct SecurityScanner {
    rules: CompiledRules,
    checks: Vec<Box<dyn PackageCheck>>,
}

impl SecurityScanner {
    /// Compiles `rules` up front so that a bad pattern is reported before any
    /// package is touched.
    pub fn new(rules: ScanRules) -> Result<Self, ScanError> {
        Ok(Self {
            rules: CompiledRules::compile(rules)?,
            checks: all_checks(),
        })
    }

    pub fn rules(&self) -> &ScanRules {
        self.rules.rules()
    }

    /// Scans the extracted package at `path`.
    ///
    /// # Errors
    ///
    /// Fails only when the package cannot be walked at all (missing path,
    /// not a directory). Problems with individual files become findings.
    pub fn scan(&self, path: &Path) -> Result<ScanResult, ScanError> {
        let tree = self.load(path)?;
        let mut scans = ScanBreakdown::default();

        for check in &self.checks {
            check.run(&tree, &self.rules, &mut scans);
            tracing::debug!(check = check.name(), package = %path.display(), "check finished");
        }

        let result = ScanResult::new(path.to_path_buf(), scans);
        tracing::info!(
            package = %path.display(),
            passed = result.passed,
            issues = result.issues.len(),
            warnings = result.warnings.len(),
            "security scan complete"
        );
        Ok(result)
    }

    pub fn validate_structure(&self, path: &Path) -> Result<StructureReport, ScanError> {
        Ok(validate_structure(&self.load(path)?, self.rules.rules()))
    }

    pub fn scan_dangerous_functions(
        &self,
        path: &Path,
    ) -> Result<DangerousFunctionReport, ScanError> {
        Ok(scan_dangerous_functions(&self.load(path)?, &self.rules))
    }

    pub fn scan_vulnerabilities(&self, path: &Path) -> Result<VulnerabilityReport, ScanError> {
        Ok(scan_vulnerabilities(&self.load(path)?, &self.rules))
    }

    pub fn validate_manifest(&self, path: &Path) -> Result<ManifestReport, ScanError> {
        Ok(validate_manifest(&self.load(path)?.root, &self.rules))
    }

    pub fn scan_malware_patterns(&self, path: &Path) -> Result<MalwareReport, ScanError> {
        Ok(scan_malware_patterns(&self.load(path)?, &self.rules))
    }

    fn load(&self, path: &Path) -> Result<PackageTree, ScanError> {
        PackageTree::load(path, self.rules.rules())
    }
}
