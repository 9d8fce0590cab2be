pub mod checker;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod output;
pub mod scanner;

pub use checker::CompatibilityChecker;
pub use config::Config;
pub use error::{ConstraintError, ManifestError, RevenueError, ScanError, StoreError};
pub use ledger::RevenueCalculator;
pub use model::{CompatibilityReport, Platform, RevenueReport, ScanResult, Severity, Transaction};
pub use scanner::SecurityScanner;
