//! Compatibility checking of extension manifests against the installed
//! environment.
//!
//! # Example
//!
//! ```
//! use extvet::checker::{CompatibilityChecker, InstalledEnvironment};
//! use extvet::model::Requirements;
//!
//! let env = InstalledEnvironment::new(Some("2.4.0"), Some("10.48.4"), Some("8.2.12"));
//! let checker = CompatibilityChecker::new(env);
//!
//! let req = Requirements {
//!     runtime: Some("^8.1".to_string()),
//!     ..Default::default()
//! };
//! assert!(checker.check_compatibility(&req).compatible);
//! ```

mod compatibility;
mod constraint;
mod environment;
mod manifest;

pub use compatibility::CompatibilityChecker;
pub use constraint::{coerce_version, VersionConstraint};
pub use environment::{EnvironmentProbe, InstalledEnvironment};
pub use manifest::{parse_lock_file, parse_manifest, DEFAULT_MANIFEST};

use crate::config::EnvironmentConfig;

/// Checker wired to the configured environment.
pub fn default_checker(config: &EnvironmentConfig) -> CompatibilityChecker {
    CompatibilityChecker::new(InstalledEnvironment::from_config(config))
        .with_framework_package(config.framework_package.clone())
}
