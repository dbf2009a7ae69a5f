//! JSON-file record store.
//!
//! The whole record set is rewritten on every save: written to a sibling
//! temporary file, then renamed over the target. The in-memory view only
//! takes a record once the file holding it is in place.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{SendError, SendResult};
use crate::lifecycle::memory::MemoryStore;
use crate::lifecycle::record::SendTransactionRecord;
use crate::lifecycle::store::{check_update, TransactionStore};

fn storage_error(path: &Path, error: impl std::fmt::Display) -> SendError {
    SendError::Storage(format!("{}: {}", path.display(), error))
}

/// Durable store for the command-line binary.
#[derive(Debug)]
pub struct FileStore {
    records: MemoryStore,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens `path`, loading existing records when the file exists.
    pub fn open(path: impl Into<PathBuf>) -> SendResult<Self> {
        let path = path.into();
        let records = MemoryStore::new();

        if path.exists() {
            let file = File::open(&path).map_err(|e| storage_error(&path, e))?;
            let map: BTreeMap<String, SendTransactionRecord> =
                serde_json::from_reader(BufReader::new(file)).map_err(|e| storage_error(&path, e))?;
            for (_, record) in map {
                records.restore(record);
            }
            tracing::info!(path = %path.display(), records = records.len(), "Loaded send records");
        }

        Ok(Self {
            records,
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current records with `record` applied.
    async fn persist_with(&self, record: &SendTransactionRecord) -> SendResult<()> {
        let mut map: BTreeMap<String, SendTransactionRecord> = self
            .records
            .snapshot()
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        map.insert(record.id.clone(), record.clone());

        let bytes = serde_json::to_vec_pretty(&map).map_err(|e| storage_error(&self.path, e))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(|e| storage_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), records = map.len(), "Saved send records");
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for FileStore {
    async fn get(&self, id: &str) -> SendResult<Option<SendTransactionRecord>> {
        self.records.get(id).await
    }

    async fn save(&self, record: &SendTransactionRecord) -> SendResult<()> {
        let _guard = self.write_lock.lock().await;
        // Writers are serialized by the lock, so the check still holds at `put`.
        check_update(self.records.get(&record.id).await?.as_ref(), record)?;
        self.persist_with(record).await?;
        self.records.put(record)
    }

    async fn list_for_wallet(&self, wallet_id: &str) -> SendResult<Vec<SendTransactionRecord>> {
        self.records.list_for_wallet(wallet_id).await
    }
}
