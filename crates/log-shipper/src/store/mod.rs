// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Storage backends for the durable queue.
//!
//! The durable queue only ever needs three things from its storage: append a
//! record and learn its id, read the oldest records in id order, and delete a
//! set of ids. [`LogStore`] is that contract; [`SledStore`] persists to disk
//! and [`MemoryStore`] keeps everything in process.

mod disk;
mod memory;

pub use disk::SledStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::LogRecord;

#[async_trait]
pub trait LogStore: Send + Sync {
    /// Appends a record and returns the id it was stored under. Ids increase
    /// monotonically with insertion order.
    async fn insert(&self, record: LogRecord) -> Result<u64, StoreError>;

    /// Returns up to `limit` of the oldest records, ascending by id, each
    /// carrying its id. The result is a snapshot: later inserts never show up
    /// in an already returned batch.
    async fn fetch_oldest(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError>;

    /// Removes the given ids. Unknown ids are ignored.
    async fn delete(&self, ids: &[u64]) -> Result<(), StoreError>;

    /// Number of records waiting in the store.
    async fn len(&self) -> Result<usize, StoreError>;

    async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }
}
