use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;

use super::Severity;

/// A single observation made by one of the scanner checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable identifier of the rule that fired, e.g. `dangerous-function`.
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    /// Path relative to the package root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// 1-based line number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Finding {
    pub fn new(rule: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            severity,
            message: message.into(),
            file: None,
            line: None,
        }
    }

    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// One-line rendering used in aggregated issue/warning lists.
    pub fn describe(&self) -> String {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{}:{}: {}", file.display(), line, self.message),
            (Some(file), None) => format!("{}: {}", file.display(), self.message),
            _ => self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureReport {
    pub valid: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub files_checked: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerousFunctionReport {
    pub has_critical: bool,
    pub critical: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub files_scanned: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    pub issues: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub files_scanned: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestReport {
    pub valid: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalwareReport {
    pub issues: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub files_scanned: usize,
}

/// Per-check breakdown of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanBreakdown {
    pub structure: StructureReport,
    pub dangerous_functions: DangerousFunctionReport,
    pub vulnerabilities: VulnerabilityReport,
    pub manifest: ManifestReport,
    pub malware: MalwareReport,
}

impl ScanBreakdown {
    /// All blocking findings in check order.
    pub fn issues(&self) -> impl Iterator<Item = &Finding> {
        self.structure
            .errors
            .iter()
            .chain(&self.dangerous_functions.critical)
            .chain(&self.vulnerabilities.issues)
            .chain(&self.manifest.errors)
            .chain(&self.malware.issues)
    }

    /// All non-blocking findings in check order.
    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.structure
            .warnings
            .iter()
            .chain(&self.dangerous_functions.warnings)
            .chain(&self.vulnerabilities.warnings)
            .chain(&self.manifest.warnings)
            .chain(&self.malware.warnings)
    }

    pub fn passed(&self) -> bool {
        self.structure.valid
            && !self.dangerous_functions.has_critical
            && self.vulnerabilities.issues.is_empty()
            && self.manifest.valid
            && self.malware.issues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub status: String,
    pub files_scanned: usize,
    pub issue_count: usize,
    pub warning_count: usize,
}

/// Aggregated verdict for one extension package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub package: PathBuf,
    pub passed: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub scans: ScanBreakdown,
    pub summary: ScanSummary,
    pub scanned_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(package: PathBuf, scans: ScanBreakdown) -> Self {
        let issues: Vec<String> = scans.issues().map(Finding::describe).collect();
        let warnings: Vec<String> = scans.warnings().map(Finding::describe).collect();
        let passed = scans.passed();

        let summary = ScanSummary {
            status: if passed { "passed" } else { "failed" }.to_string(),
            files_scanned: scans.structure.files_checked,
            issue_count: issues.len(),
            warning_count: warnings.len(),
        };

        Self {
            package,
            passed,
            issues,
            warnings,
            scans,
            summary,
            scanned_at: Utc::now(),
        }
    }

    /// Short status line.
    pub fn summary_line(&self) -> String {
        if self.passed {
            if self.warnings.is_empty() {
                "Security scan passed".to_string()
            } else {
                format!("Security scan passed with {} warning(s)", self.warnings.len())
            }
        } else {
            format!(
                "Security scan failed: {} issue(s), {} warning(s)",
                self.issues.len(),
                self.warnings.len()
            )
        }
    }

    /// Multi-line human readable report.
    pub fn detailed_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Security Scan Report");
        let _ = writeln!(out, "====================");
        let _ = writeln!(out, "Package: {}", self.package.display());
        let _ = writeln!(
            out,
            "Scanned at: {}",
            self.scanned_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(out, "Files scanned: {}", self.summary.files_scanned);
        let _ = writeln!(out, "Status: {}", self.summary.status.to_uppercase());
        let _ = writeln!(out);

        let sections = [
            ("Structure", self.scans.structure.valid),
            ("Dangerous functions", !self.scans.dangerous_functions.has_critical),
            ("Vulnerabilities", self.scans.vulnerabilities.issues.is_empty()),
            ("Manifest", self.scans.manifest.valid),
            ("Malware patterns", self.scans.malware.issues.is_empty()),
        ];
        let _ = writeln!(out, "Checks:");
        for (name, ok) in sections {
            let _ = writeln!(out, "  {:<20} {}", name, if ok { "ok" } else { "FAILED" });
        }

        if !self.issues.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Issues ({}):", self.issues.len());
            for issue in &self.issues {
                let _ = writeln!(out, "  - {}", issue);
            }
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Warnings ({}):", self.warnings.len());
            for warning in &self.warnings {
                let _ = writeln!(out, "  - {}", warning);
            }
        }

        let _ = writeln!(out);
        let _ = write!(out, "{}", self.summary_line());
        out
    }
}
