use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::glob_match;
use crate::error::ScanError;

/// Detection lists and thresholds used by the security checks.
///
/// Everything here can be overridden from the `[scanner]` section of the
/// config file; the defaults target PHP extension packages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRules {
    /// Manifest every package must ship at its root.
    pub manifest_file: String,

    /// Calls that fail a scan (code evaluation, command execution).
    pub critical_functions: Vec<String>,

    /// Calls that are reported as warnings.
    pub warning_functions: Vec<String>,

    /// File names containing any of these (case-insensitive) are rejected.
    pub suspicious_names: Vec<String>,

    /// Server configuration files that get a warning.
    pub sensitive_files: Vec<String>,

    /// Extensions that must not be hidden behind a second extension.
    pub executable_extensions: Vec<String>,

    /// Files with these extensions are never read.
    pub binary_extensions: Vec<String>,

    /// Glob patterns (relative to the package root) excluded from scanning.
    pub ignore_paths: Vec<String>,

    /// Regexes for raw queries built from request input.
    pub sql_injection_patterns: Vec<String>,

    /// Regexes for credential-like literals.
    pub credential_patterns: Vec<String>,

    /// Regexes for dangerous manifest script commands.
    pub suspicious_script_patterns: Vec<String>,

    /// Manifest script hooks that run automatically on install/update.
    pub lifecycle_scripts: Vec<String>,

    /// Substrings of known malware droppers (matched case-insensitively).
    pub malware_signatures: Vec<String>,

    /// Minimum length of a base64-looking run to be reported.
    pub base64_min_length: usize,

    /// Lines longer than this many characters are reported.
    pub max_line_length: usize,

    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            manifest_file: "composer.json".to_string(),
            critical_functions: strings(&[
                "eval",
                "exec",
                "system",
                "shell_exec",
                "passthru",
                "proc_open",
                "popen",
                "pcntl_exec",
            ]),
            warning_functions: strings(&[
                "assert",
                "create_function",
                "unserialize",
                "base64_decode",
                "curl_exec",
                "fsockopen",
                "move_uploaded_file",
                "extract",
            ]),
            suspicious_names: strings(&[
                "backdoor",
                "shell",
                "c99",
                "r57",
                "b374k",
                "webshell",
                "rootkit",
                "keylogger",
                "exploit",
            ]),
            sensitive_files: strings(&[".htaccess", ".user.ini", ".env"]),
            executable_extensions: strings(&[
                "php", "php3", "php4", "php5", "php7", "phtml", "phar", "pl", "py", "cgi", "sh",
                "exe", "asp", "aspx", "jsp",
            ]),
            binary_extensions: strings(&[
                "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "woff", "woff2", "ttf", "eot",
                "otf", "mp3", "mp4", "wav", "ogg", "pdf", "zip", "gz", "tar", "phar", "jar",
                "exe", "dll", "so", "dylib",
            ]),
            ignore_paths: strings(&[".git/*"]),
            sql_injection_patterns: strings(&[
                r"(?i)\b(?:DB::(?:raw|select|statement|unprepared)|whereRaw|selectRaw|orderByRaw|havingRaw|groupByRaw|mysqli_query|mysql_query|pg_query)\s*\([^;]*\$_(?:GET|POST|REQUEST|COOKIE)",
                r"(?i)\b(?:DB::(?:raw|select|statement|unprepared)|whereRaw|selectRaw|orderByRaw|havingRaw|groupByRaw)\s*\([^;]*\$request->(?:input|get|query|all)\s*\(",
                r"(?i)\b(?:SELECT|INSERT|UPDATE|DELETE)\b[^;]*\$_(?:GET|POST|REQUEST|COOKIE)",
            ]),
            credential_patterns: strings(&[
                r#"(?i)\$?[a-z_]*(?:password|passwd|secret|api_?key|key|token)[a-z_]*['"]?\s*(?:=>|=)\s*['"][A-Za-z0-9+/=_\-]{16,}['"]"#,
            ]),
            suspicious_script_patterns: strings(&[
                r"(?i)\b(?:curl|wget)\b[^|;&]*\|\s*(?:sudo\s+)?(?:ba|z|k|da)?sh\b",
                r"(?i)\bbase64\s+(?:-d|--decode)\b[^|]*\|\s*(?:ba)?sh\b",
                r"(?i)\brm\s+-(?:rf|fr)\s+/(?:\s|\*|$)",
                r"(?i)\b(?:nc|ncat|netcat)\b.*\s-e\s",
                r"/dev/tcp/",
                r"(?i)\beval\b",
            ]),
            lifecycle_scripts: strings(&[
                "pre-install-cmd",
                "post-install-cmd",
                "pre-update-cmd",
                "post-update-cmd",
                "post-autoload-dump",
                "post-root-package-install",
                "post-create-project-cmd",
                "pre-package-install",
                "post-package-install",
            ]),
            malware_signatures: strings(&[
                "eval(base64_decode",
                "eval(gzinflate",
                "eval(gzuncompress",
                "eval(str_rot13",
                "assert(base64_decode",
                "filesman",
                "c99shell",
                "r57shell",
            ]),
            base64_min_length: 200,
            max_line_length: 1000,
            max_file_size: 5 * 1024 * 1024,
        }
    }
}

impl ScanRules {
    /// Whether a package-relative path (with `/` separators) is excluded.
    pub fn is_ignored(&self, relative: &str) -> bool {
        self.ignore_paths
            .iter()
            .any(|pattern| glob_match(pattern, relative))
    }

    pub fn is_binary_extension(&self, extension: &str) -> bool {
        self.binary_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }

    pub fn is_executable_extension(&self, extension: &str) -> bool {
        self.executable_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// [`ScanRules`] with every pattern compiled once.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    rules: ScanRules,
    pub(crate) critical_calls: Vec<(String, Regex)>,
    pub(crate) warning_calls: Vec<(String, Regex)>,
    pub(crate) sql_injection: Vec<Regex>,
    pub(crate) credentials: Vec<Regex>,
    pub(crate) scripts: Vec<Regex>,
    pub(crate) base64: Regex,
}

impl CompiledRules {
    pub fn compile(rules: ScanRules) -> Result<Self, ScanError> {
        Ok(Self {
            critical_calls: call_patterns(&rules.critical_functions)?,
            warning_calls: call_patterns(&rules.warning_functions)?,
            sql_injection: compile_all(&rules.sql_injection_patterns)?,
            credentials: compile_all(&rules.credential_patterns)?,
            scripts: compile_all(&rules.suspicious_script_patterns)?,
            base64: compile(&format!(
                "[A-Za-z0-9+/]{{{},}}={{0,2}}",
                rules.base64_min_length.max(1)
            ))?,
            rules,
        })
    }

    pub fn rules(&self) -> &ScanRules {
        &self.rules
    }
}

fn compile(pattern: &str) -> Result<Regex, ScanError> {
    Regex::new(pattern).map_err(|source| ScanError::InvalidRule {
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ScanError> {
    patterns.iter().map(|p| compile(p)).collect()
}

/// `name(` with optional whitespace, not preceded by a word character.
fn call_patterns(names: &[String]) -> Result<Vec<(String, Regex)>, ScanError> {
    names
        .iter()
        .map(|name| {
            let re = compile(&format!(r"\b{}\s*\(", regex::escape(name)))?;
            Ok((name.clone(), re))
        })
        .collect()
}
