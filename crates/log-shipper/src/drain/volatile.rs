// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::queue::{Received, VolatileReceiver};
use crate::record::LogRecord;
use crate::uploader::Uploader;

/// Collect/flush loop for the in-memory mode.
///
/// Records are buffered until `batch_limit` are held or `flush_timeout`
/// passes without a new one, then the buffer is uploaded once and cleared,
/// whatever the outcome. A failed batch is lost.
pub struct VolatileDrain {
    receiver: VolatileReceiver,
    uploader: Arc<dyn Uploader>,
    batch_limit: usize,
    flush_timeout: Duration,
    buffer: Vec<LogRecord>,
}

impl VolatileDrain {
    #[must_use]
    pub fn new(
        receiver: VolatileReceiver,
        uploader: Arc<dyn Uploader>,
        batch_limit: usize,
        flush_timeout: Duration,
    ) -> Self {
        Self {
            receiver,
            uploader,
            batch_limit,
            flush_timeout,
            buffer: Vec::with_capacity(batch_limit),
        }
    }

    /// Runs until `cancel` fires or every sender is dropped, then gives the
    /// records still buffered or queued one last flush.
    pub async fn run(mut self, cancel: CancellationToken) {
        debug!("LOGS | Volatile drain started");
        loop {
            let received = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                received = self.receiver.receive(self.flush_timeout) => received,
            };
            match received {
                Received::Record(record) => self.push(record).await,
                Received::TimedOut => {
                    if !self.buffer.is_empty() {
                        self.flush().await;
                    }
                }
                Received::Closed => break,
            }
        }

        while let Some(record) = self.receiver.try_receive() {
            self.push(record).await;
        }
        if !self.buffer.is_empty() {
            debug!("LOGS | Final flush of {} buffered records", self.buffer.len());
            self.flush().await;
        }
        debug!("LOGS | Volatile drain stopped");
    }

    async fn push(&mut self, record: LogRecord) {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_limit {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_limit));
        match self.uploader.upload(&batch).await {
            Ok(()) => debug!("LOGS | Flushed {} records", batch.len()),
            Err(e) => warn!(
                "LOGS | Dropping {} records after failed upload ({} delivered): {}",
                batch.len(),
                e.delivered(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::volatile;
    use crate::record::LogLevel;
    use crate::testing::RecordingUploader;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(LogLevel::Info, "volatile", message)
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_flushes_partial_buffer() {
        let (tx, rx) = volatile::channel();
        let uploader = Arc::new(RecordingUploader::new());
        let drain = VolatileDrain::new(rx, uploader.clone(), 10, Duration::from_millis(5000));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(drain.run(cancel.clone()));

        for i in 0..3 {
            tx.send(record(&format!("m{i}"))).unwrap();
        }

        tokio::time::sleep(Duration::from_millis(4999)).await;
        assert!(uploader.batches().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(uploader.messages(), vec![vec!["m0", "m1", "m2"]]);

        // Nothing left behind for a final flush.
        cancel.cancel();
        task.await.unwrap();
        assert_eq!(uploader.batches().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_flushes_full_batches() {
        let (tx, rx) = volatile::channel();
        let uploader = Arc::new(RecordingUploader::new());
        let drain = VolatileDrain::new(rx, uploader.clone(), 10, Duration::from_millis(5000));
        let task = tokio::spawn(drain.run(CancellationToken::new()));

        for i in 0..25 {
            tx.send(record(&format!("m{i}"))).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        let sizes: Vec<usize> = uploader.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10]);

        tokio::time::sleep(Duration::from_millis(5000)).await;
        let sizes: Vec<usize> = uploader.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_is_dropped_not_retried() {
        let (tx, rx) = volatile::channel();
        let uploader = Arc::new(RecordingUploader::with_script([Some(0)]));
        let drain = VolatileDrain::new(rx, uploader.clone(), 3, Duration::from_millis(1000));
        let task = tokio::spawn(drain.run(CancellationToken::new()));

        for message in ["a", "b", "c"] {
            tx.send(record(message)).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        tx.send(record("d")).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            uploader.messages(),
            vec![vec!["a", "b", "c"], vec!["d"]]
        );

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_flushes_remaining_records_once() {
        let (tx, rx) = volatile::channel();
        let uploader = Arc::new(RecordingUploader::new());
        let drain = VolatileDrain::new(rx, uploader.clone(), 10, Duration::from_secs(60));
        let cancel = CancellationToken::new();

        for i in 0..4 {
            tx.send(record(&format!("m{i}"))).unwrap();
        }
        cancel.cancel();
        drain.run(cancel).await;

        assert_eq!(uploader.messages(), vec![vec!["m0", "m1", "m2", "m3"]]);
    }

    #[tokio::test]
    async fn test_closed_queue_flushes_and_exits() {
        let (tx, rx) = volatile::channel();
        let uploader = Arc::new(RecordingUploader::new());
        let drain = VolatileDrain::new(rx, uploader.clone(), 10, Duration::from_secs(60));

        tx.send(record("last words")).unwrap();
        drop(tx);
        drain.run(CancellationToken::new()).await;

        assert_eq!(uploader.messages(), vec![vec!["last words"]]);
    }
}
