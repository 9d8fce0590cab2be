use crate::model::{
    CompatibilityReport, Finding, RevenueBucket, RevenueReport, RevenueSplit, ScanResult,
    Severity, SystemInfo, Transaction,
};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Files")]
    files: usize,
    #[tabled(rename = "Issues")]
    issues: usize,
    #[tabled(rename = "Warnings")]
    warnings: usize,
}

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Check")]
    name: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Required")]
    required: String,
    #[tabled(rename = "Result")]
    result: String,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Sales")]
    transactions: usize,
    #[tabled(rename = "Gross")]
    gross: String,
    #[tabled(rename = "Net")]
    net: String,
    #[tabled(rename = "Platform Fees")]
    fees: String,
    #[tabled(rename = "Seller Revenue")]
    seller: String,
}

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Extension")]
    extension: String,
    #[tabled(rename = "Seller")]
    seller: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Fee")]
    fee: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Date")]
    date: String,
}

fn table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn fields(pairs: Vec<(&str, String)>) -> String {
    table(
        pairs
            .into_iter()
            .map(|(field, value)| FieldRow {
                field: field.to_string(),
                value,
            })
            .collect(),
    )
}

/// Overview table for all scanned packages followed by one findings table
/// per package that has any.
pub fn scan_table(results: &[ScanResult]) -> String {
    let mut out = String::new();

    if results.is_empty() {
        return "No packages scanned.".to_string();
    }

    let rows: Vec<PackageRow> = results
        .iter()
        .map(|r| PackageRow {
            package: truncate(&r.package.display().to_string(), 50),
            status: format_status(r.passed),
            files: r.summary.files_scanned,
            issues: r.issues.len(),
            warnings: r.warnings.len(),
        })
        .collect();
    let _ = writeln!(out, "{}", table(rows));

    for result in results {
        let mut findings: Vec<&Finding> =
            result.scans.issues().chain(result.scans.warnings()).collect();
        if findings.is_empty() {
            continue;
        }
        findings.sort_by_key(|f| f.severity);

        let _ = writeln!(out);
        let _ = writeln!(out, "{}: {}", result.package.display(), result.summary_line());
        let rows: Vec<FindingRow> = findings
            .into_iter()
            .map(|f| FindingRow {
                severity: format_severity(f.severity),
                rule: f.rule.clone(),
                location: format_location(f),
                message: truncate(&f.message, 70),
            })
            .collect();
        let _ = writeln!(out, "{}", table(rows));
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    let _ = writeln!(out);
    let _ = write!(
        out,
        "Summary: {} package(s) scanned, {} passed, {} failed",
        results.len(),
        results.len() - failed,
        failed
    );
    out
}

pub fn compatibility_table(report: &CompatibilityReport) -> String {
    let mut out = String::new();

    if report.checks.is_empty() {
        let _ = writeln!(out, "No version constraints declared.");
    } else {
        let rows: Vec<CheckRow> = report
            .checks
            .iter()
            .map(|c| CheckRow {
                name: match &c.package {
                    Some(package) => format!("{} ({})", c.name, package),
                    None => c.name.clone(),
                },
                current: c.current.clone().unwrap_or_else(|| "-".to_string()),
                required: c.required.clone(),
                result: format_status(c.compatible),
            })
            .collect();
        let _ = writeln!(out, "{}", table(rows));
    }

    for error in &report.errors {
        let _ = writeln!(out, "  error: {}", error);
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "  warning: {}", warning);
    }

    let _ = writeln!(out);
    let _ = write!(
        out,
        "{}",
        if report.compatible {
            "Compatible"
        } else {
            "Not compatible"
        }
    );
    out
}

pub fn system_info_table(info: &SystemInfo) -> String {
    let unknown = || "unknown".to_string();
    fields(vec![
        ("Platform version", info.platform_version.clone().unwrap_or_else(unknown)),
        ("Framework version", info.framework_version.clone().unwrap_or_else(unknown)),
        ("Runtime version", info.runtime_version.clone().unwrap_or_else(unknown)),
        ("Operating system", info.os.as_str().to_string()),
        ("extvet", info.tool_version.clone()),
    ])
}

pub fn split_table(split: &RevenueSplit) -> String {
    fields(vec![
        ("Amount", split.amount.to_string()),
        ("Platform fee %", split.platform_fee_percentage.to_string()),
        ("Platform fee", split.platform_fee.to_string()),
        ("Seller revenue", split.seller_revenue.to_string()),
    ])
}

pub fn transactions_table(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "No transactions.".to_string();
    }
    table(
        transactions
            .iter()
            .map(|tx| TransactionRow {
                id: tx.id.to_string(),
                extension: truncate(&tx.extension_id, 30),
                seller: truncate(&tx.seller_id, 20),
                amount: tx.amount.to_string(),
                fee: tx.platform_fee.to_string(),
                status: tx.status.to_string(),
                date: tx.created_at.format("%Y-%m-%d").to_string(),
            })
            .collect(),
    )
}

pub fn revenue_report_table(report: &RevenueReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    let period = match (report.period.start, report.period.end) {
        (None, None) => "all time".to_string(),
        (start, end) => format!(
            "{} .. {}",
            start.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            end.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
        ),
    };

    let _ = writeln!(out, "Revenue report ({:?}, {})", report.scope, period);
    let _ = writeln!(
        out,
        "{}",
        fields(vec![
            ("Gross revenue", s.gross_revenue.to_string()),
            ("Refunded", s.refunded_amount.to_string()),
            ("Net revenue", s.net_revenue.to_string()),
            ("Platform fees", s.platform_fees.to_string()),
            ("Seller revenue", s.seller_revenue.to_string()),
            (
                "Sales",
                format!(
                    "{} ({} completed, {} refunded)",
                    s.sale_count, s.completed_count, s.refunded_count
                ),
            ),
            ("Refunds", s.refund_count.to_string()),
            ("Average sale", s.average_transaction.to_string()),
        ])
    );

    for (title, buckets) in [
        ("By month", &report.by_month),
        ("By extension", &report.by_extension),
        ("By payment method", &report.by_payment_method),
    ] {
        if buckets.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", title);
        let _ = writeln!(out, "{}", bucket_table(buckets));
    }

    out.trim_end().to_string()
}

fn bucket_table(buckets: &BTreeMap<String, RevenueBucket>) -> String {
    table(
        buckets
            .iter()
            .map(|(key, b)| BucketRow {
                key: truncate(key, 30),
                transactions: b.transactions,
                gross: b.gross_revenue.to_string(),
                net: b.net_revenue.to_string(),
                fees: b.platform_fees.to_string(),
                seller: b.seller_revenue.to_string(),
            })
            .collect(),
    )
}

fn format_status(ok: bool) -> String {
    if ok {
        "\x1b[32mPASS\x1b[0m".to_string()
    } else {
        "\x1b[31mFAIL\x1b[0m".to_string()
    }
}

fn format_severity(severity: Severity) -> String {
    match severity {
        Severity::Critical => "\x1b[31mCRITICAL\x1b[0m".to_string(),
        Severity::High => "\x1b[91mHIGH\x1b[0m".to_string(),
        Severity::Medium => "\x1b[33mMEDIUM\x1b[0m".to_string(),
        Severity::Low => "\x1b[32mLOW\x1b[0m".to_string(),
    }
}

fn format_location(finding: &Finding) -> String {
    match (&finding.file, finding.line) {
        (Some(file), Some(line)) => format!("{}:{}", file.display(), line),
        (Some(file), None) => file.display().to_string(),
        _ => "-".to_string(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
