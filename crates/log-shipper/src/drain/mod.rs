// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Consumers moving queued records to the uploader.
//!
//! - [`DurableDrain`]: triggered periodically, ships the oldest stored batch
//!   and deletes it only once fully delivered.
//! - [`VolatileDrain`]: a long-running loop collecting records from memory and
//!   flushing them on a size threshold or after an idle timeout.

pub mod durable;
pub mod volatile;

pub use durable::{DrainOutcome, DurableDrain};
pub use volatile::VolatileDrain;
