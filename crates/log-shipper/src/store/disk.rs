// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sled-backed durable store.
//!
//! Records live in a dedicated tree keyed by their id encoded big-endian, so
//! sled's lexicographic key order is the insertion order. Ids come from
//! [`sled::Db::generate_id`], which stays monotonic across restarts. Id
//! assignment and the tree insert happen under one lock, so a record is
//! never visible before a record with a lower id. Every mutation is flushed
//! to disk before it is acknowledged.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sled::{Batch, Config as SledConfig, Db, IVec, Tree};
use tracing::debug;

use super::LogStore;
use crate::error::StoreError;
use crate::record::LogRecord;

/// Tree holding pending log records.
const RECORDS_TREE: &str = "log_record";

#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    records: Tree,
    path: PathBuf,
    insert_order: Arc<Mutex<()>>,
}

impl SledStore {
    /// Opens (or creates) the store at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                // sled does not create intermediate directories.
                fs::create_dir_all(parent)?;
            }
        }

        let db = sled_config(&path).open()?;
        let records = db.open_tree(RECORDS_TREE)?;
        debug!(
            "LOGS | Opened durable store at {} with {} pending records",
            path.display(),
            records.len()
        );
        Ok(Self {
            db,
            records,
            path,
            insert_order: Arc::default(),
        })
    }

    /// Opens a store that lives in memory and vanishes on drop.
    pub fn open_temporary() -> Result<Self, StoreError> {
        let db = SledConfig::new().temporary(true).open()?;
        let records = db.open_tree(RECORDS_TREE)?;
        Ok(Self {
            db,
            records,
            path: PathBuf::new(),
            insert_order: Arc::default(),
        })
    }

    /// Filesystem path backing the store; empty for temporary stores.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        // generate_id starts at 0; records are numbered from 1.
        Ok(self.db.generate_id()? + 1)
    }
}

#[async_trait]
impl LogStore for SledStore {
    async fn insert(&self, record: LogRecord) -> Result<u64, StoreError> {
        let value = serde_json::to_vec(&record)?;
        let id = {
            let _order = self
                .insert_order
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let id = self.next_id()?;
            self.records.insert(id.to_be_bytes(), value)?;
            id
        };
        self.records.flush_async().await?;
        Ok(id)
    }

    async fn fetch_oldest(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError> {
        let mut batch = Vec::with_capacity(limit.min(self.records.len()));
        for entry in self.records.iter().take(limit) {
            let (key, value) = entry?;
            batch.push(decode(&key, &value)?);
        }
        Ok(batch)
    }

    async fn delete(&self, ids: &[u64]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut batch = Batch::default();
        for id in ids {
            batch.remove(id.to_be_bytes().to_vec());
        }
        self.records.apply_batch(batch)?;
        self.records.flush_async().await?;
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }
}

fn sled_config(path: &Path) -> SledConfig {
    SledConfig::new()
        .path(path)
        .cache_capacity(16 * 1024 * 1024)
}

fn decode(key: &IVec, value: &IVec) -> Result<LogRecord, StoreError> {
    let bytes = <[u8; 8]>::try_from(&key[..]).map_err(|_| StoreError::CorruptKey(key.len()))?;
    let record: LogRecord = serde_json::from_slice(value)?;
    Ok(record.with_id(u64::from_be_bytes(bytes)))
}
