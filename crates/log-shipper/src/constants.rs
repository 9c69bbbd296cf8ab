// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Defaults for the shipper configuration.

use std::time::Duration;

/// Period of the durable-mode drain job.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Records fetched per durable drain.
pub const DEFAULT_DURABLE_BATCH_LIMIT: usize = 50;

/// Buffer size that triggers a volatile flush.
pub const DEFAULT_VOLATILE_BATCH_LIMIT: usize = 10;

/// Idle time after which a partial volatile buffer is flushed.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request timeout; exceeding it counts as a transport failure.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// First delay before re-running a durable drain that asked for a retry.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(30);

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Tag used when the caller does not supply one.
pub const DEFAULT_TAG: &str = "App";

/// Unique name the durable drain job is registered under.
pub const DEFAULT_JOB_NAME: &str = "UploadLogs";

pub const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:9200/logs/_doc";

pub const DEFAULT_STORE_PATH: &str = "common_log.db";
