//! Durable store contract and the in-memory implementation.
//!
//! The store is the only shared mutable state between concurrent worker
//! invocations. All lifecycle transitions go through transactions with
//! optimistic version checks, so a record observed by two overlapping
//! workers is claimed by exactly one; the loser's commit fails with
//! [`StoreError::Conflict`] and nothing is persisted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::record::{JobKey, JobRecord, RecordFilter};

/// Trait for durable job storage.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new record. Fails if the key already exists.
    async fn insert(&self, record: JobRecord) -> StoreResult<JobKey>;

    /// Load a record.
    async fn get(&self, key: &JobKey) -> StoreResult<Option<JobRecord>>;

    /// Load several records, in key order, `None` where absent.
    async fn get_multi(&self, keys: &[JobKey]) -> StoreResult<Vec<Option<JobRecord>>>;

    /// Write a record outside a transaction.
    async fn put(&self, record: JobRecord) -> StoreResult<()>;

    /// Write several records atomically with respect to readers.
    async fn put_multi(&self, records: Vec<JobRecord>) -> StoreResult<()>;

    /// Keys of records matching a filter, in deterministic order
    /// (submission time, then key).
    async fn query_keys(&self, filter: &RecordFilter) -> StoreResult<Vec<JobKey>>;

    /// Open a transaction.
    async fn transaction(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// An open store transaction.
///
/// Reads observe committed state and pin the versions they saw; writes
/// are buffered until [`commit`](StoreTransaction::commit), which
/// publishes all of them or none.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Read a record, pinning its current version.
    async fn get(&mut self, key: &JobKey) -> StoreResult<Option<JobRecord>>;

    /// Buffer a write. A later write to the same key replaces it.
    fn put(&mut self, record: JobRecord);

    /// Commit all buffered writes.
    ///
    /// Fails with [`StoreError::Conflict`] if any written record changed
    /// since this transaction read it, and with
    /// [`StoreError::TransactionTimeout`] past the deadline. In both
    /// cases nothing is persisted.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
struct Versioned {
    version: u64,
    record: JobRecord,
}

/// In-memory versioned store.
///
/// Used by tests and the CLI. Cloning shares the underlying records, so
/// clones model concurrent workers against one store.
#[derive(Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<FxHashMap<JobKey, Versioned>>>,
    txn_timeout: Duration,
}

impl MemoryStore {
    /// Create an empty store with a 5 second transaction deadline.
    pub fn new() -> Self {
        Self::with_txn_timeout(Duration::from_secs(5))
    }

    /// Create an empty store with a custom transaction deadline.
    pub fn with_txn_timeout(txn_timeout: Duration) -> Self {
        Self {
            records: Arc::new(RwLock::new(FxHashMap::default())),
            txn_timeout,
        }
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert(&self, record: JobRecord) -> StoreResult<JobKey> {
        let key = record.key.clone();
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        records.insert(key.clone(), Versioned { version: 1, record });
        Ok(key)
    }

    async fn get(&self, key: &JobKey) -> StoreResult<Option<JobRecord>> {
        let records = self.records.read().await;
        Ok(records.get(key).map(|v| v.record.clone()))
    }

    async fn get_multi(&self, keys: &[JobKey]) -> StoreResult<Vec<Option<JobRecord>>> {
        let records = self.records.read().await;
        Ok(keys
            .iter()
            .map(|key| records.get(key).map(|v| v.record.clone()))
            .collect())
    }

    async fn put(&self, record: JobRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        let version = records.get(&record.key).map_or(0, |v| v.version) + 1;
        records.insert(record.key.clone(), Versioned { version, record });
        Ok(())
    }

    async fn put_multi(&self, writes: Vec<JobRecord>) -> StoreResult<()> {
        let mut records = self.records.write().await;
        for record in writes {
            let version = records.get(&record.key).map_or(0, |v| v.version) + 1;
            records.insert(record.key.clone(), Versioned { version, record });
        }
        Ok(())
    }

    async fn query_keys(&self, filter: &RecordFilter) -> StoreResult<Vec<JobKey>> {
        let records = self.records.read().await;
        let mut matched: Vec<_> = records
            .values()
            .filter(|v| filter.matches(&v.record))
            .map(|v| (v.record.submitted_at, v.record.key.clone()))
            .collect();
        matched.sort();
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched.into_iter().map(|(_, key)| key).collect())
    }

    async fn transaction(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            records: Arc::clone(&self.records),
            observed: FxHashMap::default(),
            writes: Vec::new(),
            deadline: Instant::now() + self.txn_timeout,
        }))
    }
}

/// Transaction over a [`MemoryStore`].
///
/// Holds an `Arc` to the record map rather than a borrow, so boxed
/// transactions are `'static`.
struct MemoryTransaction {
    records: Arc<RwLock<FxHashMap<JobKey, Versioned>>>,
    /// Versions observed by reads; 0 means the key was absent.
    observed: FxHashMap<JobKey, u64>,
    writes: Vec<JobRecord>,
    deadline: Instant,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get(&mut self, key: &JobKey) -> StoreResult<Option<JobRecord>> {
        let records = self.records.read().await;
        let versioned = records.get(key);
        // The first read pins the version the commit will check against.
        self.observed
            .entry(key.clone())
            .or_insert_with(|| versioned.map_or(0, |v| v.version));
        Ok(versioned.map(|v| v.record.clone()))
    }

    fn put(&mut self, record: JobRecord) {
        if let Some(existing) = self.writes.iter_mut().find(|w| w.key == record.key) {
            *existing = record;
        } else {
            self.writes.push(record);
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if Instant::now() > self.deadline {
            return Err(StoreError::TransactionTimeout);
        }

        let mut records = self.records.write().await;

        // Validate before mutating anything.
        for write in &self.writes {
            let current = records.get(&write.key).map_or(0, |v| v.version);
            if let Some(&observed) = self.observed.get(&write.key) {
                if observed != current {
                    return Err(StoreError::Conflict(write.key.to_string()));
                }
            }
        }

        for record in self.writes {
            let version = records.get(&record.key).map_or(0, |v| v.version) + 1;
            records.insert(record.key.clone(), Versioned { version, record });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let record = JobRecord::new("OPENQASM 2.0;", 10);
        let key = store.insert(record.clone()).await.unwrap();

        let loaded = store.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded.program, "OPENQASM 2.0;");

        assert!(matches!(
            store.insert(record).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_query_respects_filter_and_limit() {
        let store = MemoryStore::new();
        for _ in 0..4 {
            store.insert(JobRecord::new("x", 1)).await.unwrap();
        }
        let mut verified = JobRecord::new("y", 1);
        verified.verified = true;
        store.insert(verified).await.unwrap();

        let unverified = store.query_keys(&RecordFilter::unverified()).await.unwrap();
        assert_eq!(unverified.len(), 4);

        let page = store
            .query_keys(&RecordFilter::unverified().with_limit(2))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        // Pages are stable prefixes of the full ordering.
        assert_eq!(page, unverified[..2].to_vec());
    }

    #[tokio::test]
    async fn test_transaction_buffers_until_commit() {
        let store = MemoryStore::new();
        let key = store.insert(JobRecord::new("x", 1)).await.unwrap();

        let mut txn = store.transaction().await.unwrap();
        let mut record = txn.get(&key).await.unwrap().unwrap();
        record.verified = true;
        txn.put(record);

        // Not visible before commit
        assert!(!store.get(&key).await.unwrap().unwrap().verified);

        txn.commit().await.unwrap();
        assert!(store.get(&key).await.unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn test_conflicting_commit_fails() {
        let store = MemoryStore::new();
        let key = store.insert(JobRecord::new("x", 1)).await.unwrap();

        let mut txn_a = store.transaction().await.unwrap();
        let mut txn_b = store.transaction().await.unwrap();

        let mut rec_a = txn_a.get(&key).await.unwrap().unwrap();
        let mut rec_b = txn_b.get(&key).await.unwrap().unwrap();
        rec_a.sent = true;
        rec_b.sent = true;
        txn_a.put(rec_a);
        txn_b.put(rec_b);

        txn_a.commit().await.unwrap();
        assert!(matches!(
            txn_b.commit().await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_past_deadline_persists_nothing() {
        let store = MemoryStore::with_txn_timeout(Duration::ZERO);
        let key = store.insert(JobRecord::new("x", 1)).await.unwrap();

        let mut txn = store.transaction().await.unwrap();
        let mut record = txn.get(&key).await.unwrap().unwrap();
        record.verified = true;
        txn.put(record);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(matches!(
            txn.commit().await,
            Err(StoreError::TransactionTimeout)
        ));
        assert!(!store.get(&key).await.unwrap().unwrap().verified);
    }
}
