//! Core data types shared by the ledger, checker and scanner.
//!
//! - [`Transaction`] - A marketplace purchase or refund row
//! - [`ExtensionVersion`] / [`ExtensionManifest`] - Submitted extension metadata
//! - [`ScanResult`] - Aggregated security scan verdict
//! - [`CompatibilityReport`] - Constraint evaluation against the environment
//! - [`RevenueReport`] - Aggregated revenue statistics
//!
//! # Example
//!
//! ```
//! use extvet::model::{Requirements, Severity};
//!
//! let req = Requirements::default();
//! assert!(req.is_empty());
//! assert_eq!(Severity::Critical.as_str(), "critical");
//! ```

mod compat;
mod manifest;
mod report;
mod scan;
mod transaction;

pub use compat::*;
pub use manifest::*;
pub use report::*;
pub use scan::*;
pub use transaction::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        #[cfg(target_os = "macos")]
        return Platform::MacOS;
        #[cfg(target_os = "windows")]
        return Platform::Windows;
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        return Platform::Linux;
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOS => "macos",
            Platform::Windows => "windows",
        }
    }
}

/// Severity of a scan finding.
///
/// `Critical` and `High` findings are issues and fail a scan; `Medium` and
/// `Low` findings are warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
