mod cli;
pub mod json;
mod sarif;

pub use cli::{
    compatibility_table, revenue_report_table, scan_table, split_table, system_info_table,
    transactions_table,
};
pub use sarif::render_sarif;

use crate::model::ScanResult;
use anyhow::Result;

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
    /// SARIF format for code scanning upload
    Sarif,
    /// Plain-text detailed report per package
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "sarif" => Ok(OutputFormat::Sarif),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err(format!(
                "Unknown format: {}. Use 'table', 'json', 'sarif', or 'text'",
                s
            )),
        }
    }
}

/// Renders scan results in `format`.
pub fn format_scan_results(results: &[ScanResult], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(scan_table(results)),
        OutputFormat::Json => json::to_pretty(&results),
        OutputFormat::Sarif => render_sarif(results),
        OutputFormat::Text => Ok(results
            .iter()
            .map(ScanResult::detailed_report)
            .collect::<Vec<_>>()
            .join("\n\n")),
    }
}
