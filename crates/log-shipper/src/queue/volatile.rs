// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory hand-off between producers and the single volatile consumer.
//!
//! ```text
//!    ┌──────────────┐
//!    │   Senders    │ (Multiple producers, cloneable)
//!    └──────┬───────┘
//!           │ unbounded channel
//!           v
//!    ┌──────────────┐
//!    │   Receiver   │ (Single consumer, the volatile drain)
//!    └──────────────┘
//! ```
//!
//! The channel is unbounded: `send` never blocks and never pushes back. Under
//! sustained overload memory grows without limit; that is the price of the
//! low-latency, best-effort mode.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::record::LogRecord;

/// Creates a connected sender/receiver pair.
#[must_use]
pub fn channel() -> (VolatileSender, VolatileReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (VolatileSender { tx }, VolatileReceiver { rx })
}

/// Producer side of the volatile queue.
#[derive(Clone, Debug)]
pub struct VolatileSender {
    tx: mpsc::UnboundedSender<LogRecord>,
}

impl VolatileSender {
    /// Queues a record without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the record was queued
    /// - `Err(record)` if the consumer is gone
    pub fn send(&self, record: LogRecord) -> Result<(), LogRecord> {
        self.tx.send(record).map_err(|e| e.0)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Outcome of a bounded wait on the volatile queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Received {
    Record(LogRecord),
    /// Nothing arrived within the timeout.
    TimedOut,
    /// Every sender has been dropped and the queue is empty.
    Closed,
}

/// Consumer side of the volatile queue.
#[derive(Debug)]
pub struct VolatileReceiver {
    rx: mpsc::UnboundedReceiver<LogRecord>,
}

impl VolatileReceiver {
    /// Waits up to `timeout` for the next record.
    pub async fn receive(&mut self, timeout: Duration) -> Received {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(record)) => Received::Record(record),
            Ok(None) => Received::Closed,
            Err(_) => Received::TimedOut,
        }
    }

    /// Takes a record if one is immediately available.
    pub fn try_receive(&mut self) -> Option<LogRecord> {
        self.rx.try_recv().ok()
    }
}
