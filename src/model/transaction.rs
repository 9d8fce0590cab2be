use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A marketplace ledger row.
///
/// Sales carry positive amounts. A refund is a separate row with negated
/// amounts, `status == Refunded` and `refund_of` pointing at the sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub extension_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: Decimal,
    pub platform_fee: Decimal,
    pub seller_revenue: Decimal,
    pub payment_method: String,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_of: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_refund(&self) -> bool {
        self.refund_of.is_some()
    }

    /// Builds the paired refund row for this sale.
    pub fn refund_entry(&self, reason: impl Into<String>) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            extension_id: self.extension_id.clone(),
            buyer_id: self.buyer_id.clone(),
            seller_id: self.seller_id.clone(),
            amount: -self.amount,
            platform_fee: -self.platform_fee,
            seller_revenue: -self.seller_revenue,
            payment_method: self.payment_method.clone(),
            status: TransactionStatus::Refunded,
            refund_of: Some(self.id),
            refund_reason: Some(reason.into()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for recording a completed purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    pub extension_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: Decimal,
    pub payment_method: String,
}

/// Result of splitting an amount between the platform and the seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSplit {
    pub amount: Decimal,
    pub platform_fee_percentage: Decimal,
    pub platform_fee: Decimal,
    pub seller_revenue: Decimal,
}

/// Inclusive date bounds for ledger queries. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sale() -> Transaction {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Transaction {
            id: Uuid::new_v4(),
            extension_id: "ext-1".to_string(),
            buyer_id: "buyer-1".to_string(),
            seller_id: "seller-1".to_string(),
            amount: Decimal::new(10000, 2),
            platform_fee: Decimal::new(3000, 2),
            seller_revenue: Decimal::new(7000, 2),
            payment_method: "card".to_string(),
            status: TransactionStatus::Completed,
            refund_of: None,
            refund_reason: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_refund_entry_negates_amounts() {
        let original = sale();
        let refund = original.refund_entry("duplicate charge");

        assert_eq!(refund.amount, -original.amount);
        assert_eq!(refund.platform_fee, -original.platform_fee);
        assert_eq!(refund.seller_revenue, -original.seller_revenue);
        assert_eq!(refund.amount, refund.platform_fee + refund.seller_revenue);
        assert_eq!(refund.refund_of, Some(original.id));
        assert_eq!(refund.status, TransactionStatus::Refunded);
        assert!(refund.is_refund());
        assert!(!original.is_refund());
    }

    #[test]
    fn test_date_range_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let range = DateRange::new(Some(start), Some(end));

        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()));
        assert!(DateRange::all().contains(start));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TransactionStatus::Refunded).unwrap();
        assert_eq!(json, "\"refunded\"");
    }
}
