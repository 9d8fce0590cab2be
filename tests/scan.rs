use extvet::output::{format_scan_results, OutputFormat};
use extvet::scanner::{ScanRules, SecurityScanner};
use extvet::Severity;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn minimal_package() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "composer.json",
        r#"{
            "name": "acme/crm-maps",
            "description": "Map widgets",
            "require": {"php": "^8.1", "laravel/framework": "^10.0"},
            "scripts": {"test": "phpunit"}
        }"#,
    );
    write(
        dir.path(),
        "src/MapsServiceProvider.php",
        "<?php\n\nnamespace Acme\\Maps;\n\nclass MapsServiceProvider\n{\n    public function boot(): void {}\n}\n",
    );
    write(dir.path(), "resources/js/maps.js", "export const zoom = 4;\n");
    dir
}

#[test]
fn minimal_package_passes() {
    let dir = minimal_package();
    let scanner = SecurityScanner::new(ScanRules::default()).unwrap();

    let result = scanner.scan(dir.path()).unwrap();

    assert!(result.passed, "unexpected issues: {:?}", result.issues);
    assert!(result.issues.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.summary.files_scanned, 3);
    assert_eq!(result.summary_line(), "Security scan passed");
}

#[test]
fn malicious_package_fails_every_content_check() {
    let dir = minimal_package();
    write(dir.path(), "src/Boot.php", "<?php\neval(base64_decode($_POST['p']));\n");
    write(
        dir.path(),
        "src/Report.php",
        "<?php\nDB::select(\"SELECT * FROM orders WHERE id = \" . $_GET['id']);\n",
    );
    write(dir.path(), "public/logo.php.png", "<?php system($_GET['c']);");
    write(dir.path(), "vendor/acme/lib/eval.php", "<?php eval($x);");

    let scanner = SecurityScanner::new(ScanRules::default()).unwrap();
    let result = scanner.scan(dir.path()).unwrap();

    assert!(!result.passed);
    assert!(!result.scans.structure.valid);
    assert!(result.scans.dangerous_functions.has_critical);
    assert!(!result.scans.vulnerabilities.issues.is_empty());
    assert!(!result.scans.malware.issues.is_empty());
    assert!(result
        .scans
        .issues()
        .all(|f| f.severity == Severity::Critical || f.severity == Severity::High));
    assert!(result
        .issues
        .iter()
        .any(|i| i.starts_with("vendor/acme/lib/eval.php")));
}

#[test]
fn bundled_vendor_code_is_scanned() {
    let dir = minimal_package();
    write(dir.path(), "vendor/evil/Boot.php", "<?php eval($_POST['x']);");

    let scanner = SecurityScanner::new(ScanRules::default()).unwrap();
    let result = scanner.scan(dir.path()).unwrap();

    assert!(!result.passed);
    assert!(result.scans.dangerous_functions.has_critical);
}

#[test]
fn nul_bytes_do_not_hide_executable_code() {
    let dir = minimal_package();
    let path = dir.path().join("src/Boot.php");
    fs::write(&path, b"<?php /*\x00*/ eval($_POST['x']);").unwrap();

    let scanner = SecurityScanner::new(ScanRules::default()).unwrap();
    let result = scanner.scan(dir.path()).unwrap();

    assert!(!result.passed);
    assert!(result.scans.dangerous_functions.has_critical);
    assert!(result
        .scans
        .structure
        .errors
        .iter()
        .any(|f| f.rule == "binary-executable"));
}

#[test]
fn missing_manifest_is_invalid() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/Plugin.php", "<?php class Plugin {}");

    let scanner = SecurityScanner::new(ScanRules::default()).unwrap();
    let structure = scanner.validate_structure(dir.path()).unwrap();

    assert!(!structure.valid);
    assert!(!structure.errors.is_empty());
}

#[test]
fn custom_rules_extend_detection() {
    let dir = minimal_package();
    write(dir.path(), "src/Debug.php", "<?php var_dump($user);");

    let mut rules = ScanRules::default();
    rules.critical_functions.push("var_dump".to_string());
    let scanner = SecurityScanner::new(rules).unwrap();

    let report = scanner.scan_dangerous_functions(dir.path()).unwrap();
    assert!(report.has_critical);
}

#[test]
fn json_and_text_rendering() {
    let dir = minimal_package();
    let scanner = SecurityScanner::new(ScanRules::default()).unwrap();
    let results = vec![scanner.scan(dir.path()).unwrap()];

    let json = format_scan_results(&results, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["passed"], true);
    assert_eq!(value[0]["summary"]["status"], "passed");

    let text = format_scan_results(&results, OutputFormat::Text).unwrap();
    assert!(text.starts_with("Security Scan Report"));
    assert!(text.ends_with("Security scan passed"));
}
