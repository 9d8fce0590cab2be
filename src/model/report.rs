use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::DateRange;

/// What a revenue report was generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ReportScope {
    Seller(String),
    Extension(String),
    Platform,
}

/// Headline figures of a revenue report.
///
/// `gross_revenue` counts sales (including ones later refunded);
/// `refunded_amount` is the absolute value of refund rows; the fee and
/// revenue totals are net of refunds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub gross_revenue: Decimal,
    pub refunded_amount: Decimal,
    pub net_revenue: Decimal,
    pub platform_fees: Decimal,
    pub seller_revenue: Decimal,
    pub sale_count: usize,
    pub completed_count: usize,
    pub refunded_count: usize,
    pub refund_count: usize,
    pub average_transaction: Decimal,
}

/// Totals for one bucket of a breakdown (an extension, a month, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueBucket {
    pub transactions: usize,
    pub gross_revenue: Decimal,
    pub net_revenue: Decimal,
    pub platform_fees: Decimal,
    pub seller_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueReport {
    pub scope: ReportScope,
    pub period: DateRange,
    pub summary: RevenueSummary,
    pub by_extension: BTreeMap<String, RevenueBucket>,
    pub by_seller: BTreeMap<String, RevenueBucket>,
    /// Keyed by `YYYY-MM`.
    pub by_month: BTreeMap<String, RevenueBucket>,
    pub by_payment_method: BTreeMap<String, RevenueBucket>,
}
