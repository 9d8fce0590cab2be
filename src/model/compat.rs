use serde::{Deserialize, Serialize};

use super::Platform;

/// One evaluated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityCheck {
    /// `platform`, `framework`, `runtime` or `dependency`.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub current: Option<String>,
    pub required: String,
    pub compatible: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub compatible: bool,
    pub checks: Vec<CompatibilityCheck>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl CompatibilityReport {
    /// An empty report is compatible until a check fails.
    pub fn new() -> Self {
        Self {
            compatible: true,
            checks: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, check: CompatibilityCheck) {
        if !check.compatible {
            self.compatible = false;
            self.errors.push(check.message.clone());
        }
        self.checks.push(check);
    }

    pub(crate) fn fail(&mut self, error: impl Into<String>) {
        self.compatible = false;
        self.errors.push(error.into());
    }

    pub(crate) fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

impl Default for CompatibilityReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Versions of the running environment, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub platform_version: Option<String>,
    pub framework_version: Option<String>,
    pub runtime_version: Option<String>,
    pub os: Platform,
    pub tool_version: String,
}
