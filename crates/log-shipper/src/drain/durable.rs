// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::layer::suppressed;
use crate::queue::DurableQueue;
use crate::scheduler::{JobResult, PeriodicJob};
use crate::uploader::Uploader;

/// Result of one durable drain attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The batch was delivered and deleted, or there was nothing to send.
    Success,
    /// Something failed; every record is still in the store.
    Retry,
    /// Another drain was already running; this trigger did nothing.
    Coalesced,
}

/// Ships the oldest stored records in one batch per trigger.
///
/// At most one drain runs at a time. Records are deleted only after the
/// whole batch was uploaded, so a failure anywhere leaves the store untouched
/// and the same batch is offered again on the next trigger.
pub struct DurableDrain {
    queue: DurableQueue,
    uploader: Arc<dyn Uploader>,
    batch_limit: usize,
    draining: AtomicBool,
}

/// Clears the drain flag however the drain future ends, including when it is
/// dropped mid-upload.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DurableDrain {
    #[must_use]
    pub fn new(queue: DurableQueue, uploader: Arc<dyn Uploader>, batch_limit: usize) -> Self {
        Self {
            queue,
            uploader,
            batch_limit,
            draining: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub async fn drain(&self) -> DrainOutcome {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("LOGS | Drain already in progress, coalescing trigger");
            return DrainOutcome::Coalesced;
        }
        let _guard = DrainGuard(&self.draining);
        suppressed(self.drain_batch()).await
    }

    async fn drain_batch(&self) -> DrainOutcome {
        let batch = match self.queue.fetch_oldest(self.batch_limit).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("LOGS | Failed to read pending records: {}", e);
                return DrainOutcome::Retry;
            }
        };
        if batch.is_empty() {
            debug!("LOGS | No pending records to upload");
            return DrainOutcome::Success;
        }

        if let Err(e) = self.uploader.upload(&batch).await {
            warn!(
                "LOGS | Upload failed after {} of {} records, keeping batch for retry: {}",
                e.delivered(),
                batch.len(),
                e
            );
            return DrainOutcome::Retry;
        }

        match self.queue.delete_batch(&batch).await {
            Ok(()) => {
                debug!("LOGS | Uploaded and removed {} records", batch.len());
                DrainOutcome::Success
            }
            Err(e) => {
                // The batch will be sent again; duplicates are accepted.
                warn!("LOGS | Failed to delete uploaded records: {}", e);
                DrainOutcome::Retry
            }
        }
    }
}

#[async_trait]
impl PeriodicJob for DurableDrain {
    async fn run(&self) -> JobResult {
        match self.drain().await {
            DrainOutcome::Success | DrainOutcome::Coalesced => JobResult::Success,
            DrainOutcome::Retry => JobResult::Retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::record::{LogLevel, LogRecord};
    use crate::store::{LogStore, MemoryStore};
    use crate::testing::{BlockingUploader, RecordingUploader};

    async fn queue_with(count: usize) -> DurableQueue {
        let queue = DurableQueue::new(Arc::new(MemoryStore::new()));
        for i in 1..=count {
            queue
                .enqueue(LogRecord::new(LogLevel::Info, "drain", format!("m{i}")))
                .await
                .unwrap();
        }
        queue
    }

    fn ids(records: &[LogRecord]) -> Vec<u64> {
        records.iter().filter_map(LogRecord::id).collect()
    }

    #[tokio::test]
    async fn test_successful_upload_deletes_exactly_the_batch() {
        let queue = queue_with(7).await;
        let uploader = Arc::new(RecordingUploader::new());
        let drain = DurableDrain::new(queue.clone(), uploader.clone(), 5);

        assert_eq!(drain.drain().await, DrainOutcome::Success);

        let sent = uploader.batches();
        assert_eq!(sent.len(), 1);
        assert_eq!(ids(&sent[0]), vec![1, 2, 3, 4, 5]);
        assert_eq!(ids(&queue.fetch_oldest(10).await.unwrap()), vec![6, 7]);
    }

    #[tokio::test]
    async fn test_failed_upload_deletes_nothing() {
        let queue = queue_with(5).await;
        // Records at index 0..3 reach the collector, the fourth fails.
        let uploader = Arc::new(RecordingUploader::with_script([Some(3)]));
        let drain = DurableDrain::new(queue.clone(), uploader.clone(), 5);

        assert_eq!(drain.drain().await, DrainOutcome::Retry);

        let remaining = queue.fetch_oldest(5).await.unwrap();
        assert_eq!(ids(&remaining), vec![1, 2, 3, 4, 5]);
        assert!(!drain.is_draining());
    }

    #[tokio::test]
    async fn test_retry_resends_the_same_batch() {
        let queue = queue_with(3).await;
        let uploader = Arc::new(RecordingUploader::with_script([Some(1), None]));
        let drain = DurableDrain::new(queue.clone(), uploader.clone(), 50);

        assert_eq!(drain.drain().await, DrainOutcome::Retry);
        assert_eq!(drain.drain().await, DrainOutcome::Success);

        let sent = uploader.batches();
        assert_eq!(sent.len(), 2);
        assert_eq!(ids(&sent[0]), ids(&sent[1]));
        assert_eq!(queue.pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_store_is_success_without_upload() {
        let queue = queue_with(0).await;
        let uploader = Arc::new(RecordingUploader::new());
        let drain = DurableDrain::new(queue, uploader.clone(), 50);

        assert_eq!(drain.drain().await, DrainOutcome::Success);
        assert!(uploader.batches().is_empty());
    }

    #[tokio::test]
    async fn test_triggers_during_drain_are_coalesced() {
        let queue = queue_with(3).await;
        let uploader = Arc::new(BlockingUploader::new());
        let drain = Arc::new(DurableDrain::new(queue.clone(), uploader.clone(), 50));

        let first = tokio::spawn({
            let drain = Arc::clone(&drain);
            async move { drain.drain().await }
        });
        uploader.started.notified().await;

        assert_eq!(drain.drain().await, DrainOutcome::Coalesced);
        assert_eq!(drain.drain().await, DrainOutcome::Coalesced);
        assert_eq!(drain.run().await, JobResult::Success);

        uploader.release.notify_one();
        assert_eq!(first.await.unwrap(), DrainOutcome::Success);
        assert_eq!(uploader.calls(), 1);
        assert_eq!(queue.pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_drain_releases_the_flag() {
        let queue = queue_with(2).await;
        let uploader = Arc::new(BlockingUploader::new());
        let drain = Arc::new(DurableDrain::new(queue.clone(), uploader.clone(), 50));

        let stuck = tokio::spawn({
            let drain = Arc::clone(&drain);
            async move { drain.drain().await }
        });
        uploader.started.notified().await;
        assert!(drain.is_draining());

        stuck.abort();
        let _ = stuck.await;
        assert!(!drain.is_draining());
        assert_eq!(queue.pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_records_added_during_drain_wait_for_next_one() {
        let queue = queue_with(2).await;
        let uploader = Arc::new(BlockingUploader::new());
        let drain = Arc::new(DurableDrain::new(queue.clone(), uploader.clone(), 50));

        let running = tokio::spawn({
            let drain = Arc::clone(&drain);
            async move { drain.drain().await }
        });
        uploader.started.notified().await;
        queue
            .enqueue(LogRecord::new(LogLevel::Info, "drain", "late"))
            .await
            .unwrap();

        uploader.release.notify_one();
        assert_eq!(running.await.unwrap(), DrainOutcome::Success);

        let remaining = queue.fetch_oldest(10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message(), "late");
    }

    struct BrokenStore;

    #[async_trait]
    impl LogStore for BrokenStore {
        async fn insert(&self, _record: LogRecord) -> Result<u64, StoreError> {
            Err(StoreError::Poisoned)
        }
        async fn fetch_oldest(&self, _limit: usize) -> Result<Vec<LogRecord>, StoreError> {
            Err(StoreError::Poisoned)
        }
        async fn delete(&self, _ids: &[u64]) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        async fn len(&self) -> Result<usize, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_retry() {
        let uploader = Arc::new(RecordingUploader::new());
        let queue = DurableQueue::new(Arc::new(BrokenStore));
        let drain = DurableDrain::new(queue, uploader.clone(), 50);

        assert_eq!(drain.drain().await, DrainOutcome::Retry);
        assert_eq!(drain.run().await, JobResult::Retry);
        assert!(uploader.batches().is_empty());
    }
}
