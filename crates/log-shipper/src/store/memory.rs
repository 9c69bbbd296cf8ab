// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::LogStore;
use crate::error::StoreError;
use crate::record::LogRecord;

#[derive(Debug, Default)]
struct Inner {
    last_id: u64,
    records: BTreeMap<u64, LogRecord>,
}

/// In-process store. Survives nothing beyond the process, but honours the
/// same ordering and snapshot rules as [`super::SledStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert(&self, record: LogRecord) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        inner.last_id += 1;
        let id = inner.last_id;
        inner.records.insert(id, record.with_id(id));
        Ok(id)
    }

    async fn fetch_oldest(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.records.values().take(limit).cloned().collect())
    }

    async fn delete(&self, ids: &[u64]) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for id in ids {
            inner.records.remove(id);
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogLevel;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(LogLevel::Info, "test", message)
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_increase() {
        let store = MemoryStore::new();
        assert_eq!(store.insert(record("a")).await.unwrap(), 1);
        assert_eq!(store.insert(record("b")).await.unwrap(), 2);
        assert_eq!(store.insert(record("c")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_fetch_oldest_is_fifo_and_bounded() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert(record(&format!("m{i}"))).await.unwrap();
        }

        let batch = store.fetch_oldest(3).await.unwrap();
        let messages: Vec<&str> = batch.iter().map(LogRecord::message).collect();
        assert_eq!(messages, vec!["m0", "m1", "m2"]);
        assert_eq!(batch[0].id(), Some(1));
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        store.insert(record("a")).await.unwrap();
        store.insert(record("b")).await.unwrap();
        store.delete(&[1, 2]).await.unwrap();

        assert_eq!(store.insert(record("c")).await.unwrap(), 3);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_ignores_unknown_ids() {
        let store = MemoryStore::new();
        store.insert(record("a")).await.unwrap();
        store.delete(&[42]).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
    }
}
