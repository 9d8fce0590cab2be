use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::round_money;
use crate::error::RevenueError;
use crate::model::{
    DateRange, ReportScope, RevenueBucket, RevenueReport, RevenueSummary, Transaction,
    TransactionStatus,
};

/// Folds ledger rows into a [`RevenueReport`].
///
/// Pending rows are ignored. A sale counts towards gross revenue even when it
/// was later refunded; its refund row subtracts from the net figures in the
/// bucket (and month) the refund was made in. Totals that overflow the
/// decimal range fail the report.
pub fn build_report(
    scope: ReportScope,
    period: DateRange,
    rows: &[Transaction],
) -> Result<RevenueReport, RevenueError> {
    let mut summary = RevenueSummary::default();
    let mut by_extension: BTreeMap<String, RevenueBucket> = BTreeMap::new();
    let mut by_seller: BTreeMap<String, RevenueBucket> = BTreeMap::new();
    let mut by_month: BTreeMap<String, RevenueBucket> = BTreeMap::new();
    let mut by_payment_method: BTreeMap<String, RevenueBucket> = BTreeMap::new();

    for tx in rows.iter().filter(|tx| tx.status != TransactionStatus::Pending) {
        if tx.is_refund() {
            summary.refund_count += 1;
            accumulate(&mut summary.refunded_amount, tx.amount.abs())?;
        } else {
            summary.sale_count += 1;
            accumulate(&mut summary.gross_revenue, tx.amount)?;
            match tx.status {
                TransactionStatus::Completed => summary.completed_count += 1,
                TransactionStatus::Refunded => summary.refunded_count += 1,
                TransactionStatus::Pending => {}
            }
        }
        accumulate(&mut summary.platform_fees, tx.platform_fee)?;
        accumulate(&mut summary.seller_revenue, tx.seller_revenue)?;

        let month = tx.created_at.format("%Y-%m").to_string();
        for (buckets, key) in [
            (&mut by_extension, tx.extension_id.clone()),
            (&mut by_seller, tx.seller_id.clone()),
            (&mut by_month, month),
            (&mut by_payment_method, tx.payment_method.clone()),
        ] {
            add_to_bucket(buckets.entry(key).or_default(), tx)?;
        }
    }

    summary.net_revenue = summary
        .gross_revenue
        .checked_sub(summary.refunded_amount)
        .ok_or_else(overflow)?;
    summary.average_transaction = if summary.sale_count == 0 {
        Decimal::ZERO
    } else {
        round_money(summary.gross_revenue / Decimal::from(summary.sale_count))
    };

    Ok(RevenueReport {
        scope,
        period,
        summary,
        by_extension,
        by_seller,
        by_month,
        by_payment_method,
    })
}

fn add_to_bucket(bucket: &mut RevenueBucket, tx: &Transaction) -> Result<(), RevenueError> {
    if !tx.is_refund() {
        bucket.transactions += 1;
        accumulate(&mut bucket.gross_revenue, tx.amount)?;
    }
    accumulate(&mut bucket.net_revenue, tx.amount)?;
    accumulate(&mut bucket.platform_fees, tx.platform_fee)?;
    accumulate(&mut bucket.seller_revenue, tx.seller_revenue)
}

fn accumulate(total: &mut Decimal, value: Decimal) -> Result<(), RevenueError> {
    *total = total.checked_add(value).ok_or_else(overflow)?;
    Ok(())
}

fn overflow() -> RevenueError {
    RevenueError::ReportFailed("Revenue totals exceed the supported range".to_string())
}
