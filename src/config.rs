//! Configuration file handling.
//!
//! This module provides loading and saving of extvet configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/extvet/config.toml`
//! - macOS: `~/Library/Application Support/extvet/config.toml`
//! - Windows: `%APPDATA%\extvet\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! default_format = "table"
//!
//! [revenue]
//! platform_fee_percentage = 30.0
//!
//! [environment]
//! platform_version = "2.4.0"
//! framework_version = "10.48.4"
//! runtime_version = "8.2.12"
//! lock_file = "/srv/crm/composer.lock"
//!
//! [scanner]
//! ignore_paths = [".git/*", "tests/fixtures/*"]
//! max_line_length = 1000
//! ```

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::scanner::ScanRules;

/// Application configuration.
///
/// Every section falls back to its defaults when omitted, so a partial file
/// is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json", "sarif", "text"
    /// Default: "table"
    pub default_format: String,

    /// Ledger file used by the `ledger` subcommands.
    ///
    /// Default: `<data dir>/extvet/ledger.json`
    pub ledger_path: PathBuf,

    pub revenue: RevenueConfig,

    pub environment: EnvironmentConfig,

    /// Detection lists and thresholds for the security scanner.
    pub scanner: ScanRules,
}

/// Revenue split settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueConfig {
    /// Share of each sale retained by the platform, in percent.
    ///
    /// Default: 30.0
    #[serde(with = "rust_decimal::serde::float")]
    pub platform_fee_percentage: Decimal,
}

impl Default for RevenueConfig {
    fn default() -> Self {
        Self {
            platform_fee_percentage: Decimal::from(30),
        }
    }
}

/// Description of the installed environment extensions are checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub platform_version: Option<String>,

    /// Falls back to the framework package's entry in the lock file.
    pub framework_version: Option<String>,

    pub runtime_version: Option<String>,

    /// Manifest key that names the framework package.
    ///
    /// Default: "laravel/framework"
    pub framework_package: String,

    /// Lock file listing installed packages (composer.lock layout).
    pub lock_file: Option<PathBuf>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            platform_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            framework_version: None,
            runtime_version: None,
            framework_package: "laravel/framework".to_string(),
            lock_file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_format: "table".to_string(),
            ledger_path: default_ledger_path(),
            revenue: RevenueConfig::default(),
            environment: EnvironmentConfig::default(),
            scanner: ScanRules::default(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("extvet")
        .join("ledger.json")
}

/// Simple glob matching (supports * as wildcard).
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    // Check prefix (before first *)
    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    // Check suffix (after last *)
    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use extvet::Config;
    ///
    /// let path = Config::config_path();
    /// assert!(path.ends_with("extvet/config.toml"));
    /// ```
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("extvet")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
