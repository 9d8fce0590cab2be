//! Marketplace revenue bookkeeping.
//!
//! [`RevenueCalculator`] splits sale amounts between the platform and the
//! seller, records purchases, processes refunds and aggregates revenue
//! reports. Persistence goes through the [`TransactionStore`] trait:
//!
//! - [`MemoryTransactionStore`] - in-process, for tests and one-shot use
//! - [`JsonLedgerStore`] - a JSON document on disk, used by the CLI
//!
//! All money values are [`Decimal`]s rounded to cents.
//!
//! # Example
//!
//! ```
//! use extvet::config::RevenueConfig;
//! use extvet::ledger::{MemoryTransactionStore, RevenueCalculator};
//! use rust_decimal::Decimal;
//!
//! let calc = RevenueCalculator::new(MemoryTransactionStore::new(), &RevenueConfig::default());
//! let split = calc.calculate_revenue_split(Decimal::from(100), None).unwrap();
//! assert_eq!(split.platform_fee, Decimal::from(30));
//! assert_eq!(split.seller_revenue, Decimal::from(70));
//! ```

mod calculator;
mod report;
mod store;

pub use calculator::{split_amount, RevenueCalculator};
pub use report::build_report;
pub use store::{JsonLedgerStore, MemoryTransactionStore, TransactionFilter, TransactionStore};

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to cents, halves away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
