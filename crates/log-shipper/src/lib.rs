// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Log Shipper
//!
//! Buffered log shipping for applications that produce structured log
//! events and deliver them to a remote collector over HTTP.
//!
//! ## Overview
//!
//! Producers hand events to a [`LogSink`]; the shipper queues them in one of
//! two modes, fixed at start:
//! - **Durable**: records are persisted in a [`store::SledStore`] and shipped
//!   in batches by a periodic job. A batch is deleted only once fully
//!   delivered, so records survive network outages and process restarts.
//! - **Volatile**: records are buffered in memory and flushed on a size
//!   threshold or after an idle timeout. A failed batch is dropped.
//!
//! ## Architecture
//!
//! ```text
//!   LogSink ──► StoreWriter ──► DurableQueue ──► DurableDrain ─┐
//!      │                                   (JobScheduler tick) │
//!      └──────► VolatileQueue ──────────────► VolatileDrain ───┴──► Uploader ──► collector
//! ```
//!
//! - [`record`]: the [`LogRecord`] value and its wire form
//! - [`store`] and [`queue`]: durable and in-memory queueing
//! - [`uploader`]: one HTTP POST per record, abort on first failure
//! - [`drain`]: consumers moving queued records to the uploader
//! - [`scheduler`]: unique periodic jobs with network constraints
//! - [`shipper`]: lifecycle, [`LogShipper`] and [`ShipperHandle`]
//! - [`global`] and [`layer`]: process-wide facade and `tracing` bridge

#![deny(clippy::all)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod config;
pub mod constants;
pub mod drain;
pub mod error;
pub mod global;
pub mod http;
pub mod layer;
pub mod queue;
pub mod record;
pub mod scheduler;
pub mod shipper;
pub mod sink;
pub mod store;
pub mod uploader;

mod writer;

#[cfg(test)]
mod testing;

pub use config::{DeliveryMode, ShipperConfig};
pub use drain::DrainOutcome;
pub use error::{ShipperError, StoreError, UploadError};
pub use layer::ShipperLayer;
pub use record::{LogLevel, LogRecord};
pub use shipper::{LogShipper, ServiceStatus, ShipperHandle};
pub use sink::LogSink;
