use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::model::{DateRange, Transaction, TransactionStatus};

/// Selection criteria for [`TransactionStore::query`]. Unset fields match
/// everything; an empty `statuses` list matches every status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub seller_id: Option<String>,
    pub extension_id: Option<String>,
    pub statuses: Vec<TransactionStatus>,
    pub range: DateRange,
}

impl TransactionFilter {
    pub fn seller(seller_id: impl Into<String>) -> Self {
        Self {
            seller_id: Some(seller_id.into()),
            ..Default::default()
        }
    }

    pub fn extension(extension_id: impl Into<String>) -> Self {
        Self {
            extension_id: Some(extension_id.into()),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[TransactionStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.seller_id.as_ref().map_or(true, |s| &tx.seller_id == s)
            && self
                .extension_id
                .as_ref()
                .map_or(true, |e| &tx.extension_id == e)
            && (self.statuses.is_empty() || self.statuses.contains(&tx.status))
            && self.range.contains(tx.created_at)
    }
}

/// Persistence collaborator of the revenue calculator.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Transaction>>;

    async fn insert(&self, tx: Transaction) -> StoreResult<()>;

    /// Matching rows in insertion order.
    async fn query(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>>;

    /// Inserts `refund` and marks `original_id` refunded as one unit. Either
    /// both changes are visible afterwards or neither is.
    async fn commit_refund(&self, original_id: Uuid, refund: Transaction) -> StoreResult<()>;
}

/// Applies a refund to an in-memory row list. Leaves `rows` untouched on
/// error.
fn apply_refund(
    rows: &mut Vec<Transaction>,
    original_id: Uuid,
    refund: Transaction,
) -> StoreResult<()> {
    let index = rows
        .iter()
        .position(|tx| tx.id == original_id)
        .ok_or(StoreError::NotFound(original_id))?;

    if rows[index].status != TransactionStatus::Completed {
        return Err(StoreError::Conflict(format!(
            "transaction {} is {}",
            original_id, rows[index].status
        )));
    }
    if rows.iter().any(|tx| tx.id == refund.id) {
        return Err(StoreError::Conflict(format!(
            "transaction {} already exists",
            refund.id
        )));
    }

    rows[index].status = TransactionStatus::Refunded;
    rows[index].updated_at = Utc::now();
    rows.push(refund);
    Ok(())
}

fn insert_row(rows: &mut Vec<Transaction>, tx: Transaction) -> StoreResult<()> {
    if rows.iter().any(|existing| existing.id == tx.id) {
        return Err(StoreError::Conflict(format!(
            "transaction {} already exists",
            tx.id
        )));
    }
    rows.push(tx);
    Ok(())
}

/// Lock-guarded in-process store.
#[derive(Debug, Default)]
pub struct MemoryTransactionStore {
    rows: RwLock<Vec<Transaction>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(rows: Vec<Transaction>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        Ok(self.rows.read().await.iter().find(|tx| tx.id == id).cloned())
    }

    async fn insert(&self, tx: Transaction) -> StoreResult<()> {
        insert_row(&mut *self.rows.write().await, tx)
    }

    async fn query(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect())
    }

    async fn commit_refund(&self, original_id: Uuid, refund: Transaction) -> StoreResult<()> {
        apply_refund(&mut *self.rows.write().await, original_id, refund)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    transactions: Vec<Transaction>,
}

/// Ledger persisted as a single JSON document.
///
/// Every mutation is applied to a copy of the rows, written to a sibling
/// temp file and renamed over the ledger. The in-memory state is only
/// replaced once the rename succeeded, so a failed write leaves both the
/// file and the store as they were.
#[derive(Debug)]
pub struct JsonLedgerStore {
    path: PathBuf,
    rows: Mutex<Vec<Transaction>>,
}

impl JsonLedgerStore {
    /// Opens the ledger at `path`. A missing file is an empty ledger; any other
    /// read failure is an error.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let rows = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str::<LedgerFile>(&content)?.transactions,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), transactions = rows.len(), "ledger opened");
        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, rows: &[Transaction]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(&LedgerFile {
            transactions: rows.to_vec(),
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, content).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Runs `change` on a copy of the rows and commits it if persisting works.
    async fn mutate<F>(&self, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Vec<Transaction>) -> StoreResult<()> + Send,
    {
        let mut rows = self.rows.lock().await;
        let mut next = rows.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *rows = next;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for JsonLedgerStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        Ok(self.rows.lock().await.iter().find(|tx| tx.id == id).cloned())
    }

    async fn insert(&self, tx: Transaction) -> StoreResult<()> {
        self.mutate(move |rows| insert_row(rows, tx)).await
    }

    async fn query(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect())
    }

    async fn commit_refund(&self, original_id: Uuid, refund: Transaction) -> StoreResult<()> {
        self.mutate(move |rows| apply_refund(rows, original_id, refund))
            .await
    }
}
