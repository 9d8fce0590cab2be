use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::report::build_report;
use super::store::{TransactionFilter, TransactionStore};
use super::round_money;
use crate::config::RevenueConfig;
use crate::error::RevenueError;
use crate::model::{
    DateRange, NewPurchase, ReportScope, RevenueReport, RevenueSplit, Transaction,
    TransactionStatus,
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Statuses that make it into revenue reports.
const REPORTED: &[TransactionStatus] = &[TransactionStatus::Completed, TransactionStatus::Refunded];

/// Splits an amount into platform fee and seller revenue.
///
/// The fee is rounded half away from zero to cents and the seller gets the
/// remainder, so `platform_fee + seller_revenue` is always `amount` rounded
/// to cents.
///
/// ```
/// use extvet::ledger::split_amount;
/// use rust_decimal::Decimal;
///
/// let split = split_amount(Decimal::new(3333, 2), Decimal::from(30)).unwrap();
/// assert_eq!(split.platform_fee, Decimal::new(1000, 2));
/// assert_eq!(split.seller_revenue, Decimal::new(2333, 2));
/// ```
pub fn split_amount(amount: Decimal, percentage: Decimal) -> Result<RevenueSplit, RevenueError> {
    if amount < Decimal::ZERO {
        return Err(RevenueError::InvalidArgument(
            "Amount must be non-negative".to_string(),
        ));
    }
    validate_percentage(percentage)?;

    let too_large = || RevenueError::InvalidArgument("Amount is too large".to_string());
    let platform_fee = amount
        .checked_mul(percentage)
        .and_then(|fee| fee.checked_div(HUNDRED))
        .map(round_money)
        .ok_or_else(too_large)?;
    let seller_revenue = round_money(amount)
        .checked_sub(platform_fee)
        .ok_or_else(too_large)?;
    Ok(RevenueSplit {
        amount,
        platform_fee_percentage: percentage,
        platform_fee,
        seller_revenue,
    })
}

fn validate_percentage(percentage: Decimal) -> Result<(), RevenueError> {
    if percentage < Decimal::ZERO || percentage > HUNDRED {
        return Err(RevenueError::InvalidArgument(
            "Platform fee percentage must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

/// Fee splitting, purchase/refund bookkeeping and revenue reporting on top
/// of a [`TransactionStore`].
pub struct RevenueCalculator<S> {
    store: S,
    platform_fee_percentage: Decimal,
}

impl<S: TransactionStore> RevenueCalculator<S> {
    /// A configured fee outside `0..=100` is ignored in favour of the default.
    pub fn new(store: S, config: &RevenueConfig) -> Self {
        let mut platform_fee_percentage = config.platform_fee_percentage;
        if validate_percentage(platform_fee_percentage).is_err() {
            let fallback = RevenueConfig::default().platform_fee_percentage;
            tracing::warn!(
                configured = %platform_fee_percentage,
                fallback = %fallback,
                "ignoring out-of-range platform fee percentage"
            );
            platform_fee_percentage = fallback;
        }
        Self {
            store,
            platform_fee_percentage,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn platform_fee_percentage(&self) -> Decimal {
        self.platform_fee_percentage
    }

    /// Changes the default fee for this calculator. Values outside `0..=100`
    /// are rejected and leave the current fee in place.
    pub fn set_platform_fee_percentage(&mut self, percentage: Decimal) -> bool {
        if validate_percentage(percentage).is_err() {
            return false;
        }
        self.platform_fee_percentage = percentage;
        true
    }

    /// Splits `amount` using `percentage`, or the configured fee when `None`.
    pub fn calculate_revenue_split(
        &self,
        amount: Decimal,
        percentage: Option<Decimal>,
    ) -> Result<RevenueSplit, RevenueError> {
        split_amount(amount, percentage.unwrap_or(self.platform_fee_percentage))
    }

    /// Records a completed sale at the configured fee.
    pub async fn record_purchase(&self, purchase: NewPurchase) -> Result<Transaction, RevenueError> {
        for (field, value) in [
            ("extension_id", &purchase.extension_id),
            ("buyer_id", &purchase.buyer_id),
            ("seller_id", &purchase.seller_id),
        ] {
            if value.trim().is_empty() {
                return Err(RevenueError::InvalidArgument(format!("{} is required", field)));
            }
        }

        let split = self.calculate_revenue_split(purchase.amount, None)?;
        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4(),
            extension_id: purchase.extension_id,
            buyer_id: purchase.buyer_id,
            seller_id: purchase.seller_id,
            amount: round_money(split.amount),
            platform_fee: split.platform_fee,
            seller_revenue: split.seller_revenue,
            payment_method: purchase.payment_method,
            status: TransactionStatus::Completed,
            refund_of: None,
            refund_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(tx.clone()).await?;
        tracing::info!(
            transaction = %tx.id,
            extension = %tx.extension_id,
            amount = %tx.amount,
            "purchase recorded"
        );
        Ok(tx)
    }

    /// Refunds a completed sale and returns the refund row.
    ///
    /// The refund row and the status change of the original are committed
    /// together; on failure the ledger is unchanged.
    pub async fn process_refund(
        &self,
        transaction_id: Uuid,
        reason: &str,
    ) -> Result<Transaction, RevenueError> {
        let original = self
            .store
            .find(transaction_id)
            .await?
            .ok_or(RevenueError::NotFound(transaction_id))?;

        match original.status {
            TransactionStatus::Refunded => return Err(RevenueError::AlreadyRefunded),
            TransactionStatus::Pending => return Err(RevenueError::NotCompleted),
            TransactionStatus::Completed => {}
        }

        let refund = original.refund_entry(reason);
        if let Err(source) = self.store.commit_refund(original.id, refund.clone()).await {
            tracing::error!(transaction = %original.id, error = %source, "refund failed");
            return Err(RevenueError::RefundFailed { source });
        }

        tracing::info!(
            transaction = %original.id,
            refund = %refund.id,
            amount = %original.amount,
            "refund processed"
        );
        Ok(refund)
    }

    pub async fn generate_seller_report(
        &self,
        seller_id: &str,
        range: DateRange,
    ) -> Result<RevenueReport, RevenueError> {
        self.report(
            ReportScope::Seller(seller_id.to_string()),
            TransactionFilter::seller(seller_id),
            range,
        )
        .await
    }

    pub async fn generate_platform_report(
        &self,
        range: DateRange,
    ) -> Result<RevenueReport, RevenueError> {
        self.report(ReportScope::Platform, TransactionFilter::default(), range)
            .await
    }

    pub async fn generate_extension_report(
        &self,
        extension_id: &str,
        range: DateRange,
    ) -> Result<RevenueReport, RevenueError> {
        self.report(
            ReportScope::Extension(extension_id.to_string()),
            TransactionFilter::extension(extension_id),
            range,
        )
        .await
    }

    async fn report(
        &self,
        scope: ReportScope,
        filter: TransactionFilter,
        range: DateRange,
    ) -> Result<RevenueReport, RevenueError> {
        let filter = filter.with_statuses(REPORTED).within(range);
        let rows = self.store.query(&filter).await.map_err(|e| {
            tracing::error!(scope = ?scope, error = %e, "revenue report query failed");
            RevenueError::ReportFailed(e.to_string())
        })?;
        build_report(scope, range, &rows)
    }

    /// Sum of seller revenue over the seller's completed sales in `range`.
    pub async fn calculate_seller_revenue(
        &self,
        seller_id: &str,
        range: DateRange,
    ) -> Result<Decimal, RevenueError> {
        let filter = TransactionFilter::seller(seller_id)
            .with_statuses(&[TransactionStatus::Completed])
            .within(range);
        let rows = self.store.query(&filter).await?;
        rows.iter()
            .try_fold(Decimal::ZERO, |total, tx| total.checked_add(tx.seller_revenue))
            .ok_or_else(|| {
                RevenueError::ReportFailed("Seller revenue exceeds the supported range".to_string())
            })
    }

    /// Seller revenue not yet paid out. Payouts are not tracked, so this is
    /// all completed revenue.
    pub async fn calculate_pending_payouts(&self, seller_id: &str) -> Result<Decimal, RevenueError> {
        self.calculate_seller_revenue(seller_id, DateRange::all())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::ledger::MemoryTransactionStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn calculator() -> RevenueCalculator<MemoryTransactionStore> {
        RevenueCalculator::new(MemoryTransactionStore::new(), &RevenueConfig::default())
    }

    fn purchase(seller: &str, extension: &str, amount: &str) -> NewPurchase {
        NewPurchase {
            extension_id: extension.to_string(),
            buyer_id: "buyer-1".to_string(),
            seller_id: seller.to_string(),
            amount: dec(amount),
            payment_method: "card".to_string(),
        }
    }

    #[test]
    fn test_split_default_percentage() {
        let split = calculator().calculate_revenue_split(dec("100"), None).unwrap();
        assert_eq!(split.platform_fee, dec("30.00"));
        assert_eq!(split.seller_revenue, dec("70.00"));
        assert_eq!(split.platform_fee_percentage, dec("30"));
    }

    #[test]
    fn test_split_rounds_fee_half_away_from_zero() {
        let split = split_amount(dec("33.33"), dec("30")).unwrap();
        assert_eq!(split.platform_fee, dec("10.00"));
        assert_eq!(split.seller_revenue, dec("23.33"));

        let split = split_amount(dec("0.05"), dec("50")).unwrap();
        assert_eq!(split.platform_fee, dec("0.03"));
        assert_eq!(split.seller_revenue, dec("0.02"));
    }

    #[test]
    fn test_split_always_sums_to_rounded_amount() {
        for cents in (0..20_000i64).step_by(7) {
            for pct in (0..=1000i64).step_by(37).chain([1000]) {
                // Three decimals exercise rounding of the amount itself.
                let amount = Decimal::new(cents * 10 + cents % 10, 3);
                let percentage = Decimal::new(pct, 1);
                let split = split_amount(amount, percentage).unwrap();

                assert_eq!(
                    split.platform_fee + split.seller_revenue,
                    round_money(amount),
                    "{} at {}%",
                    amount,
                    percentage
                );
                assert!(split.platform_fee >= Decimal::ZERO);
                assert!(split.seller_revenue >= Decimal::ZERO);
            }
        }
    }

    #[test]
    fn test_split_of_huge_amount_is_an_error() {
        let err = split_amount(Decimal::MAX, dec("30")).unwrap_err();
        assert!(matches!(err, RevenueError::InvalidArgument(ref m) if m == "Amount is too large"));

        let split = split_amount(Decimal::MAX, Decimal::ZERO).unwrap();
        assert_eq!(split.seller_revenue, Decimal::MAX);
    }

    #[tokio::test]
    async fn test_huge_purchase_is_rejected_without_recording() {
        let calc = calculator();
        let mut big = purchase("seller-1", "maps", "1");
        big.amount = Decimal::MAX;

        let err = calc.record_purchase(big).await.unwrap_err();
        assert!(matches!(err, RevenueError::InvalidArgument(_)));
        assert!(calc
            .store()
            .query(&TransactionFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_seller_revenue_overflow_is_an_error() {
        let mut sale = calculator()
            .record_purchase(purchase("seller-1", "maps", "1"))
            .await
            .unwrap();
        sale.seller_revenue = Decimal::MAX;
        let mut again = sale.clone();
        again.id = Uuid::new_v4();
        let calc = RevenueCalculator::new(
            MemoryTransactionStore::with_transactions(vec![sale, again]),
            &RevenueConfig::default(),
        );

        let err = calc.calculate_pending_payouts("seller-1").await.unwrap_err();
        assert!(matches!(err, RevenueError::ReportFailed(_)));
        let err = calc
            .generate_seller_report("seller-1", DateRange::all())
            .await
            .unwrap_err();
        assert!(matches!(err, RevenueError::ReportFailed(_)));
    }

    #[test]
    fn test_out_of_range_configured_fee_falls_back_to_default() {
        let config = RevenueConfig {
            platform_fee_percentage: dec("250"),
        };
        let calc = RevenueCalculator::new(MemoryTransactionStore::new(), &config);
        assert_eq!(calc.platform_fee_percentage(), dec("30"));
        assert!(calc.calculate_revenue_split(dec("10"), None).is_ok());
    }

    #[test]
    fn test_split_rejects_invalid_input() {
        assert!(matches!(
            split_amount(dec("-1"), dec("30")),
            Err(RevenueError::InvalidArgument(_))
        ));
        assert!(matches!(
            split_amount(dec("100"), dec("150")),
            Err(RevenueError::InvalidArgument(_))
        ));
        assert!(matches!(
            split_amount(dec("100"), dec("-0.5")),
            Err(RevenueError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_set_platform_fee_percentage() {
        let mut calc = calculator();
        assert!(calc.set_platform_fee_percentage(dec("15")));
        assert_eq!(calc.platform_fee_percentage(), dec("15"));
        assert!(!calc.set_platform_fee_percentage(dec("101")));
        assert!(!calc.set_platform_fee_percentage(dec("-1")));
        assert_eq!(calc.platform_fee_percentage(), dec("15"));

        let split = calc.calculate_revenue_split(dec("100"), None).unwrap();
        assert_eq!(split.platform_fee, dec("15.00"));
    }

    #[tokio::test]
    async fn test_record_purchase() {
        let calc = calculator();
        let tx = calc
            .record_purchase(purchase("seller-1", "maps", "49.99"))
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.platform_fee, dec("15.00"));
        assert_eq!(tx.seller_revenue, dec("34.99"));
        assert_eq!(calc.store().find(tx.id).await.unwrap(), Some(tx));
    }

    #[tokio::test]
    async fn test_record_purchase_requires_ids() {
        let err = calculator()
            .record_purchase(purchase("", "maps", "10"))
            .await
            .unwrap_err();
        assert!(matches!(err, RevenueError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_refund_creates_negated_row() {
        let calc = calculator();
        let sale = calc
            .record_purchase(purchase("seller-1", "maps", "100"))
            .await
            .unwrap();

        let refund = calc.process_refund(sale.id, "does not work").await.unwrap();
        assert_eq!(refund.amount, dec("-100.00"));
        assert_eq!(refund.platform_fee, dec("-30.00"));
        assert_eq!(refund.seller_revenue, dec("-70.00"));
        assert_eq!(refund.refund_of, Some(sale.id));
        assert_eq!(refund.refund_reason.as_deref(), Some("does not work"));

        let original = calc.store().find(sale.id).await.unwrap().unwrap();
        assert_eq!(original.status, TransactionStatus::Refunded);
    }

    #[tokio::test]
    async fn test_double_refund() {
        let calc = calculator();
        let sale = calc
            .record_purchase(purchase("seller-1", "maps", "100"))
            .await
            .unwrap();
        calc.process_refund(sale.id, "first").await.unwrap();

        let err = calc.process_refund(sale.id, "second").await.unwrap_err();
        assert!(matches!(err, RevenueError::AlreadyRefunded));
        assert_eq!(err.to_string(), "Transaction has already been refunded");
    }

    #[tokio::test]
    async fn test_refund_of_pending_transaction() {
        let mut pending = calculator()
            .record_purchase(purchase("seller-1", "maps", "5"))
            .await
            .unwrap();
        pending.status = TransactionStatus::Pending;
        let calc = RevenueCalculator::new(
            MemoryTransactionStore::with_transactions(vec![pending.clone()]),
            &RevenueConfig::default(),
        );

        let err = calc.process_refund(pending.id, "x").await.unwrap_err();
        assert!(matches!(err, RevenueError::NotCompleted));
        assert_eq!(err.to_string(), "Only completed transactions can be refunded");
    }

    #[tokio::test]
    async fn test_refund_of_unknown_transaction() {
        let id = Uuid::new_v4();
        let err = calculator().process_refund(id, "x").await.unwrap_err();
        assert!(matches!(err, RevenueError::NotFound(found) if found == id));
    }

    /// Delegates reads to a memory store but refuses to commit refunds.
    struct BrokenRefunds(MemoryTransactionStore);

    #[async_trait]
    impl TransactionStore for BrokenRefunds {
        async fn find(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
            self.0.find(id).await
        }

        async fn insert(&self, tx: Transaction) -> StoreResult<()> {
            self.0.insert(tx).await
        }

        async fn query(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
            self.0.query(filter).await
        }

        async fn commit_refund(&self, _: Uuid, _: Transaction) -> StoreResult<()> {
            Err(StoreError::Unavailable("write timeout".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_refund_leaves_ledger_unchanged() {
        let calc = RevenueCalculator::new(
            BrokenRefunds(MemoryTransactionStore::new()),
            &RevenueConfig::default(),
        );
        let sale = calc
            .record_purchase(purchase("seller-1", "maps", "100"))
            .await
            .unwrap();

        let err = calc.process_refund(sale.id, "x").await.unwrap_err();
        assert!(matches!(err, RevenueError::RefundFailed { .. }));
        assert!(err.to_string().contains("write timeout"));

        let rows = calc.store().query(&TransactionFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, TransactionStatus::Completed);
    }

    /// Every read fails.
    struct Offline;

    #[async_trait]
    impl TransactionStore for Offline {
        async fn find(&self, _: Uuid) -> StoreResult<Option<Transaction>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn insert(&self, _: Transaction) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn query(&self, _: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn commit_refund(&self, _: Uuid, _: Transaction) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_report_failure_is_reported() {
        let calc = RevenueCalculator::new(Offline, &RevenueConfig::default());
        let err = calc
            .generate_platform_report(DateRange::all())
            .await
            .unwrap_err();

        assert!(matches!(err, RevenueError::ReportFailed(_)));
        assert!(err.to_string().starts_with("Failed to generate report"));
    }

    #[tokio::test]
    async fn test_reports_and_seller_revenue() {
        let calc = calculator();
        let a = calc
            .record_purchase(purchase("seller-1", "maps", "100"))
            .await
            .unwrap();
        calc.record_purchase(purchase("seller-1", "charts", "50"))
            .await
            .unwrap();
        calc.record_purchase(purchase("seller-2", "forms", "20"))
            .await
            .unwrap();
        calc.process_refund(a.id, "refund").await.unwrap();

        let seller = calc
            .generate_seller_report("seller-1", DateRange::all())
            .await
            .unwrap();
        assert_eq!(seller.scope, ReportScope::Seller("seller-1".to_string()));
        assert_eq!(seller.summary.gross_revenue, dec("150.00"));
        assert_eq!(seller.summary.net_revenue, dec("50.00"));
        assert_eq!(seller.summary.seller_revenue, dec("35.00"));
        assert_eq!(seller.by_extension.len(), 2);

        let platform = calc.generate_platform_report(DateRange::all()).await.unwrap();
        assert_eq!(platform.summary.sale_count, 3);
        assert_eq!(platform.summary.platform_fees, dec("21.00"));
        assert_eq!(platform.by_seller.len(), 2);

        let extension = calc
            .generate_extension_report("forms", DateRange::all())
            .await
            .unwrap();
        assert_eq!(extension.summary.gross_revenue, dec("20.00"));

        assert_eq!(
            calc.calculate_seller_revenue("seller-1", DateRange::all())
                .await
                .unwrap(),
            dec("35.00")
        );
        assert_eq!(calc.calculate_pending_payouts("seller-2").await.unwrap(), dec("14.00"));
    }

    #[tokio::test]
    async fn test_report_range_excludes_outside_rows() {
        let calc = calculator();
        calc.record_purchase(purchase("seller-1", "maps", "10"))
            .await
            .unwrap();

        let tomorrow = Utc::now() + Duration::days(1);
        let report = calc
            .generate_seller_report("seller-1", DateRange::new(Some(tomorrow), None))
            .await
            .unwrap();
        assert_eq!(report.summary.sale_count, 0);
        assert_eq!(report.period, DateRange::new(Some(tomorrow), None));
    }
}
