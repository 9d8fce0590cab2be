use super::{CompiledRules, PackageCheck, PackageTree};
use crate::model::{DangerousFunctionReport, Finding, ScanBreakdown, Severity};

pub struct DangerousFunctionCheck;

impl PackageCheck for DangerousFunctionCheck {
    fn name(&self) -> &'static str {
        "dangerous_functions"
    }

    fn run(&self, tree: &PackageTree, rules: &CompiledRules, scans: &mut ScanBreakdown) {
        scans.dangerous_functions = scan_dangerous_functions(tree, rules);
    }
}

/// Line-by-line search for calls to code-evaluation and command-execution
/// functions. Matching is case-sensitive.
pub fn scan_dangerous_functions(tree: &PackageTree, rules: &CompiledRules) -> DangerousFunctionReport {
    let mut report = DangerousFunctionReport {
        files_scanned: tree.sources.len(),
        ..Default::default()
    };

    for source in &tree.sources {
        for (line_no, line) in source.numbered_lines() {
            for (name, re) in &rules.critical_calls {
                if re.is_match(line) {
                    report.critical.push(
                        Finding::new(
                            "dangerous-function",
                            Severity::Critical,
                            format!("Call to dangerous function {}()", name),
                        )
                        .in_file(&source.relative)
                        .at_line(line_no),
                    );
                }
            }

            for (name, re) in &rules.warning_calls {
                if re.is_match(line) {
                    report.warnings.push(
                        Finding::new(
                            "risky-function",
                            Severity::Medium,
                            format!("Call to risky function {}()", name),
                        )
                        .in_file(&source.relative)
                        .at_line(line_no),
                    );
                }
            }
        }
    }

    report.has_critical = !report.critical.is_empty();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanRules;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn scan(files: &[(&str, &str)]) -> DangerousFunctionReport {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let rules = CompiledRules::compile(ScanRules::default()).unwrap();
        let tree = PackageTree::load(dir.path(), rules.rules()).unwrap();
        scan_dangerous_functions(&tree, &rules)
    }

    #[test]
    fn test_eval_is_critical() {
        let report = scan(&[("Boot.php", "<?php\n\neval($x);\n")]);

        assert!(report.has_critical);
        assert_eq!(report.critical.len(), 1);
        assert_eq!(report.critical[0].file, Some(PathBuf::from("Boot.php")));
        assert_eq!(report.critical[0].line, Some(3));
    }

    #[test]
    fn test_command_execution_is_critical() {
        let report = scan(&[("Run.php", "<?php shell_exec('id'); passthru($cmd);")]);
        assert!(report.has_critical);
        assert_eq!(report.critical.len(), 2);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let report = scan(&[("a.php", "<?php EVAL($x);")]);
        assert!(!report.has_critical);
    }

    #[test]
    fn test_risky_functions_are_warnings() {
        let report = scan(&[("a.php", "<?php $data = unserialize($payload);")]);
        assert!(!report.has_critical);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].severity, Severity::Medium);
    }

    #[test]
    fn test_scans_non_php_text_files() {
        let report = scan(&[("install.js", "eval(atob(payload));")]);
        assert!(report.has_critical);
        assert_eq!(report.files_scanned, 1);
    }

    #[test]
    fn test_clean_code() {
        let report = scan(&[("a.php", "<?php\n$this->executeQuery();\ncurl_exec($ch);\n")]);
        assert!(!report.has_critical);
        assert_eq!(report.warnings.len(), 1);
    }
}
