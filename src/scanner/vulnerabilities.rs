use super::{CompiledRules, PackageCheck, PackageTree};
use crate::model::{Finding, ScanBreakdown, Severity, VulnerabilityReport};

pub struct VulnerabilityCheck;

impl PackageCheck for VulnerabilityCheck {
    fn name(&self) -> &'static str {
        "vulnerabilities"
    }

    fn run(&self, tree: &PackageTree, rules: &CompiledRules, scans: &mut ScanBreakdown) {
        scans.vulnerabilities = scan_vulnerabilities(tree, rules);
    }
}

/// SQL built from request input is an issue; credential-looking literals are
/// warnings.
pub fn scan_vulnerabilities(tree: &PackageTree, rules: &CompiledRules) -> VulnerabilityReport {
    let mut report = VulnerabilityReport {
        files_scanned: tree.sources.len(),
        ..Default::default()
    };

    for source in &tree.sources {
        for (line_no, line) in source.numbered_lines() {
            if rules.sql_injection.iter().any(|re| re.is_match(line)) {
                report.issues.push(
                    Finding::new(
                        "sql-injection",
                        Severity::High,
                        "Possible SQL injection: query built from unsanitized request input",
                    )
                    .in_file(&source.relative)
                    .at_line(line_no),
                );
            }

            if rules.credentials.iter().any(|re| re.is_match(line)) {
                report.warnings.push(
                    Finding::new(
                        "hardcoded-credential",
                        Severity::Medium,
                        "Possible hardcoded credential",
                    )
                    .in_file(&source.relative)
                    .at_line(line_no),
                );
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanRules;
    use std::fs;
    use tempfile::TempDir;

    fn scan(content: &str) -> VulnerabilityReport {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Repo.php"), content).unwrap();
        let rules = CompiledRules::compile(ScanRules::default()).unwrap();
        let tree = PackageTree::load(dir.path(), rules.rules()).unwrap();
        scan_vulnerabilities(&tree, &rules)
    }

    #[test]
    fn test_raw_query_with_superglobal() {
        let report = scan("<?php\nDB::select(\"SELECT * FROM users WHERE id = \" . $_GET['id']);\n");
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].line, Some(2));
    }

    #[test]
    fn test_raw_builder_with_request_input() {
        let report = scan("<?php $q->whereRaw('name = ' . $request->input('name'));");
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn test_bound_parameters_are_clean() {
        let report = scan("<?php DB::select('SELECT * FROM users WHERE id = ?', [$id]);");
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_hardcoded_credentials_are_warnings() {
        let report = scan("<?php\n$secret = 'AKIAIOSFODNN7EXAMPLEKEY';\n");
        assert!(report.issues.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].rule, "hardcoded-credential");
    }
}
