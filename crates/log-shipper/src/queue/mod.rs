// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The two interchangeable queueing strategies records travel through.

pub mod durable;
pub mod volatile;

pub use durable::DurableQueue;
pub use volatile::{Received, VolatileReceiver, VolatileSender};
