//! In-memory record store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::SendResult;
use crate::lifecycle::record::SendTransactionRecord;
use crate::lifecycle::store::{check_update, TransactionStore};

/// Thread-safe store backed by a [`DashMap`]; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, SendTransactionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Every record, sorted by creation time then id.
    pub fn snapshot(&self) -> Vec<SendTransactionRecord> {
        let mut records: Vec<_> = self.inner.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        records
    }

    /// Inserts without the update guard; used when loading persisted state.
    pub(crate) fn restore(&self, record: SendTransactionRecord) {
        self.inner.insert(record.id.clone(), record);
    }

    /// Guarded insert. The entry lock makes check-and-write atomic per id.
    pub(crate) fn put(&self, record: &SendTransactionRecord) -> SendResult<()> {
        match self.inner.entry(record.id.clone()) {
            Entry::Occupied(mut entry) => {
                check_update(Some(entry.get()), record)?;
                entry.insert(record.clone());
            }
            Entry::Vacant(entry) => {
                check_update(None, record)?;
                entry.insert(record.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn get(&self, id: &str) -> SendResult<Option<SendTransactionRecord>> {
        Ok(self.inner.get(id).map(|r| r.value().clone()))
    }

    async fn save(&self, record: &SendTransactionRecord) -> SendResult<()> {
        self.put(record)
    }

    async fn list_for_wallet(&self, wallet_id: &str) -> SendResult<Vec<SendTransactionRecord>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|r| r.wallet_id == wallet_id)
            .collect())
    }
}
