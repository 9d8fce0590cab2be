use super::{CompiledRules, PackageCheck, PackageTree, ScanRules};
use crate::model::{Finding, ScanBreakdown, Severity, StructureReport};

pub struct StructureCheck;

impl PackageCheck for StructureCheck {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn run(&self, tree: &PackageTree, rules: &CompiledRules, scans: &mut ScanBreakdown) {
        scans.structure = validate_structure(tree, rules.rules());
    }
}

/// Checks the package layout: manifest present, no blocklisted or disguised
/// file names.
pub fn validate_structure(tree: &PackageTree, rules: &ScanRules) -> StructureReport {
    let mut errors = tree.errors.clone();
    let mut warnings = tree.warnings.clone();

    if tree.files.is_empty() {
        errors.push(Finding::new(
            "empty-package",
            Severity::High,
            "Package contains no files",
        ));
    }

    if !tree.contains(&rules.manifest_file) {
        errors.push(
            Finding::new(
                "missing-manifest",
                Severity::High,
                format!("Required manifest file {} is missing", rules.manifest_file),
            )
            .in_file(&rules.manifest_file),
        );
    }

    for file in &tree.files {
        let name = file.file_name();
        let lower = name.to_lowercase();

        if let Some(hit) = rules
            .suspicious_names
            .iter()
            .find(|s| lower.contains(&s.to_lowercase()))
        {
            errors.push(
                Finding::new(
                    "suspicious-filename",
                    Severity::High,
                    format!("Suspicious file name (matches '{}')", hit),
                )
                .in_file(&file.relative),
            );
        }

        if let Some(hidden) = hidden_executable_extension(&name, rules) {
            errors.push(
                Finding::new(
                    "double-extension",
                    Severity::High,
                    format!("Double extension hides executable .{} file", hidden),
                )
                .in_file(&file.relative),
            );
        }

        if rules
            .sensitive_files
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&name))
        {
            warnings.push(
                Finding::new(
                    "sensitive-file",
                    Severity::Medium,
                    "Server configuration file included in package",
                )
                .in_file(&file.relative),
            );
        }
    }

    StructureReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        files_checked: tree.files.len(),
    }
}

/// `shell.php.jpg` -> `Some("php")`. The final extension is what the web
/// server sees; an executable one in the middle is the disguise.
fn hidden_executable_extension(name: &str, rules: &ScanRules) -> Option<String> {
    let parts: Vec<&str> = name.trim_start_matches('.').split('.').collect();
    if parts.len() < 3 {
        return None;
    }

    let last = parts[parts.len() - 1];
    parts[1..parts.len() - 1]
        .iter()
        .find(|ext| rules.is_executable_extension(ext) && !ext.eq_ignore_ascii_case(last))
        .map(|ext| ext.to_lowercase())
}
