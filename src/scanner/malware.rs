use super::{CompiledRules, PackageCheck, PackageTree};
use crate::model::{Finding, MalwareReport, ScanBreakdown, Severity};

pub struct MalwareCheck;

impl PackageCheck for MalwareCheck {
    fn name(&self) -> &'static str {
        "malware"
    }

    fn run(&self, tree: &PackageTree, rules: &CompiledRules, scans: &mut ScanBreakdown) {
        scans.malware = scan_malware_patterns(tree, rules);
    }
}

/// Looks for known dropper signatures and obfuscated payloads.
pub fn scan_malware_patterns(tree: &PackageTree, rules: &CompiledRules) -> MalwareReport {
    let settings = rules.rules();
    let signatures: Vec<String> = settings
        .malware_signatures
        .iter()
        .map(|s| s.to_lowercase())
        .collect();

    let mut report = MalwareReport {
        files_scanned: tree.sources.len(),
        ..Default::default()
    };

    for source in &tree.sources {
        for (line_no, line) in source.numbered_lines() {
            let lower = line.to_lowercase();
            let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();

            for signature in &signatures {
                if compact.contains(signature.as_str()) {
                    report.issues.push(
                        Finding::new(
                            "malware-signature",
                            Severity::Critical,
                            format!("Known malware signature '{}'", signature),
                        )
                        .in_file(&source.relative)
                        .at_line(line_no),
                    );
                }
            }

            if let Some(blob) = rules.base64.find(line) {
                report.issues.push(
                    Finding::new(
                        "encoded-payload",
                        Severity::High,
                        format!("Long base64-encoded literal ({} chars)", blob.as_str().len()),
                    )
                    .in_file(&source.relative)
                    .at_line(line_no),
                );
            }

            let length = line.chars().count();
            if length > settings.max_line_length {
                report.warnings.push(
                    Finding::new(
                        "long-line",
                        Severity::Low,
                        format!("Line is {} characters long, possible obfuscation", length),
                    )
                    .in_file(&source.relative)
                    .at_line(line_no),
                );
            }
        }
    }

    report
}
