// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Actor persisting records into the durable queue off the producer path.
//!
//! ```text
//!    ┌──────────────┐
//!    │   LogSinks   │ (Multiple producers, never wait on storage)
//!    └──────┬───────┘
//!           │ WriterCommand via unbounded channel
//!           v
//!    ┌──────────────┐
//!    │ StoreWriter  │ (Single consumer, owns the inserts)
//!    └──────┬───────┘
//!           v
//!    ┌──────────────┐
//!    │ DurableQueue │
//!    └──────────────┘
//! ```
//!
//! On cancellation the writer stops accepting commands and persists every
//! record already queued before it exits, so nothing a producer handed over
//! before shutdown is lost.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::queue::DurableQueue;
use crate::record::LogRecord;

#[derive(Debug)]
pub(crate) enum WriterCommand {
    /// Persist one record.
    Insert(LogRecord),
    /// Reply once every record sent before this command is persisted.
    Sync(oneshot::Sender<()>),
}

/// Cloneable producer side of the store writer.
#[derive(Clone, Debug)]
pub(crate) struct StoreWriterHandle {
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl StoreWriterHandle {
    /// Queues a record. Returns `false` if the writer is gone.
    pub(crate) fn insert(&self, record: LogRecord) -> bool {
        self.tx.send(WriterCommand::Insert(record)).is_ok()
    }

    /// Waits until everything queued so far has reached the store.
    ///
    /// Returns `false` if the writer stopped before answering.
    pub(crate) async fn sync(&self) -> bool {
        let (response_tx, response_rx) = oneshot::channel();
        if self.tx.send(WriterCommand::Sync(response_tx)).is_err() {
            return false;
        }
        response_rx.await.is_ok()
    }
}

pub(crate) struct StoreWriter {
    queue: DurableQueue,
    rx: mpsc::UnboundedReceiver<WriterCommand>,
}

impl StoreWriter {
    pub(crate) fn new(queue: DurableQueue) -> (Self, StoreWriterHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { queue, rx }, StoreWriterHandle { tx })
    }

    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        debug!("LOGS | Store writer started");
        loop {
            let command = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                command = self.rx.recv() => command,
            };
            match command {
                Some(command) => self.handle(command).await,
                None => {
                    debug!("LOGS | All sinks dropped, store writer exiting");
                    return;
                }
            }
        }

        // Refuse new records, then persist what is already queued.
        self.rx.close();
        let mut persisted = 0usize;
        while let Some(command) = self.rx.recv().await {
            if matches!(command, WriterCommand::Insert(_)) {
                persisted += 1;
            }
            self.handle(command).await;
        }
        debug!(
            "LOGS | Store writer stopped after persisting {} queued records",
            persisted
        );
    }

    async fn handle(&self, command: WriterCommand) {
        match command {
            WriterCommand::Insert(record) => {
                if let Err(e) = self.queue.enqueue(record).await {
                    error!("LOGS | Failed to persist log record, dropping it: {}", e);
                }
            }
            WriterCommand::Sync(response_tx) => {
                let _ = response_tx.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogLevel;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(LogLevel::Info, "writer", message)
    }

    #[tokio::test]
    async fn test_sync_waits_for_queued_inserts() {
        let queue = DurableQueue::new(Arc::new(MemoryStore::new()));
        let (writer, handle) = StoreWriter::new(queue.clone());
        tokio::spawn(writer.run(CancellationToken::new()));

        for i in 0..10 {
            assert!(handle.insert(record(&format!("m{i}"))));
        }
        assert!(handle.sync().await);

        let stored = queue.fetch_oldest(10).await.unwrap();
        assert_eq!(stored.len(), 10);
        assert_eq!(stored[0].message(), "m0");
        assert_eq!(stored[9].message(), "m9");
    }

    #[tokio::test]
    async fn test_cancel_persists_already_queued_records() {
        let queue = DurableQueue::new(Arc::new(MemoryStore::new()));
        let (writer, handle) = StoreWriter::new(queue.clone());
        let cancel = CancellationToken::new();

        // Queue before the writer ever runs, then cancel straight away.
        for i in 0..5 {
            assert!(handle.insert(record(&format!("m{i}"))));
        }
        cancel.cancel();
        writer.run(cancel).await;

        assert_eq!(queue.pending().await.unwrap(), 5);
        assert!(!handle.insert(record("too late")));
        assert!(!handle.sync().await);
    }

    #[tokio::test]
    async fn test_writer_exits_when_all_handles_drop() {
        let queue = DurableQueue::new(Arc::new(MemoryStore::new()));
        let (writer, handle) = StoreWriter::new(queue.clone());
        let task = tokio::spawn(writer.run(CancellationToken::new()));

        assert!(handle.insert(record("only")));
        drop(handle);
        task.await.unwrap();

        assert_eq!(queue.pending().await.unwrap(), 1);
    }
}
