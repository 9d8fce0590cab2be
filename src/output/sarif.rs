//! SARIF (Static Analysis Results Interchange Format) output for code scanning integration.
//!
//! When used with `--format sarif`, the output can be uploaded to GitHub Code Scanning
//! to show scanner findings as annotations on the offending package files.

use crate::model::{Finding, ScanResult, Severity};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// SARIF v2.1.0 schema root
#[derive(Serialize)]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
struct SarifRule {
    id: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    default_configuration: SarifRuleConfiguration,
}

#[derive(Serialize)]
struct SarifRuleConfiguration {
    level: &'static str,
}

#[derive(Serialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: &'static str,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifactLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<SarifRegion>,
}

#[derive(Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
}

fn severity_to_sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low => "note",
    }
}

fn location(result: &ScanResult, finding: &Finding) -> SarifLocation {
    let path = match &finding.file {
        Some(file) => result.package.join(file),
        None => result.package.clone(),
    };
    SarifLocation {
        physical_location: SarifPhysicalLocation {
            artifact_location: SarifArtifactLocation {
                uri: path.to_string_lossy().replace('\\', "/"),
            },
            region: finding.line.map(|start_line| SarifRegion { start_line }),
        },
    }
}

/// Renders every finding of every scanned package as one SARIF run.
pub fn render_sarif(results: &[ScanResult]) -> Result<String> {
    let mut rules: BTreeMap<String, SarifRule> = BTreeMap::new();
    let mut sarif_results = Vec::new();

    for result in results {
        for finding in result.scans.issues().chain(result.scans.warnings()) {
            let level = severity_to_sarif_level(finding.severity);

            rules
                .entry(finding.rule.clone())
                .or_insert_with(|| SarifRule {
                    id: finding.rule.clone(),
                    short_description: SarifMessage {
                        text: finding.rule.replace('-', " "),
                    },
                    default_configuration: SarifRuleConfiguration { level },
                });

            sarif_results.push(SarifResult {
                rule_id: finding.rule.clone(),
                level,
                message: SarifMessage {
                    text: format!("{}: {}", finding.severity.as_str(), finding.message),
                },
                locations: vec![location(result, finding)],
            });
        }
    }

    let report = SarifReport {
        schema: "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        version: "2.1.0",
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "extvet",
                    version: env!("CARGO_PKG_VERSION"),
                    rules: rules.into_values().collect(),
                },
            },
            results: sarif_results,
        }],
    };

    Ok(serde_json::to_string_pretty(&report)?)
}
