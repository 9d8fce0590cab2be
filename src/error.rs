//! Error types for the vetting and ledger components.
//!
//! Every public operation returns one of these through a `Result`, so callers
//! can treat expected failures (bad input, state conflicts, unreadable files,
//! store outages) uniformly. See [`crate::output::json::envelope`] for the
//! `{"success": false, "error": ...}` rendering.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Failures of the transaction store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction {0} not found")]
    NotFound(Uuid),

    #[error("conflicting update: {0}")]
    Conflict(String),

    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of revenue computation, refunds and reporting.
#[derive(Debug, Error)]
pub enum RevenueError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transaction {0} not found")]
    NotFound(Uuid),

    #[error("Transaction has already been refunded")]
    AlreadyRefunded,

    #[error("Only completed transactions can be refunded")]
    NotCompleted,

    #[error("Refund failed: {source}")]
    RefundFailed {
        #[source]
        source: StoreError,
    },

    #[error("Failed to generate report: {0}")]
    ReportFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures reading or parsing an extension manifest or lock file.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A version constraint or version string that cannot be interpreted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("empty version constraint")]
    Empty,

    #[error("invalid version constraint '{constraint}': {reason}")]
    Invalid { constraint: String, reason: String },

    #[error("invalid version '{0}'")]
    InvalidVersion(String),
}

/// Failures that prevent a package scan from running at all.
///
/// Findings inside a package are never errors; they are reported in the
/// [`crate::model::ScanResult`].
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Package path does not exist: {}", .0.display())]
    PackageNotFound(PathBuf),

    #[error("Package path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to walk package directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid scanner rule '{pattern}': {source}")]
    InvalidRule {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
