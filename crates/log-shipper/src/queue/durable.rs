// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::debug;

use crate::error::StoreError;
use crate::record::LogRecord;
use crate::store::LogStore;

/// Ordered, crash-surviving queue of pending records.
///
/// A thin adapter that sequences calls to the underlying [`LogStore`]; the
/// ordering and durability guarantees are the store's.
#[derive(Clone)]
pub struct DurableQueue {
    store: Arc<dyn LogStore>,
}

impl DurableQueue {
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    pub async fn enqueue(&self, record: LogRecord) -> Result<u64, StoreError> {
        self.store.insert(record).await
    }

    pub async fn fetch_oldest(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError> {
        self.store.fetch_oldest(limit).await
    }

    /// Deletes the records of a delivered batch.
    pub async fn delete_batch(&self, batch: &[LogRecord]) -> Result<(), StoreError> {
        let ids: Vec<u64> = batch.iter().filter_map(LogRecord::id).collect();
        if ids.is_empty() {
            return Ok(());
        }
        debug!("LOGS | Deleting {} delivered records", ids.len());
        self.store.delete(&ids).await
    }

    pub async fn pending(&self) -> Result<usize, StoreError> {
        self.store.len().await
    }
}
