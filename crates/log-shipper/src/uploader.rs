// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch upload to the collector endpoint.
//!
//! ```text
//!   records[0..n]
//!       │
//!       v
//!   ┌─────────────┐
//!   │  Serialize  │ (one JSON body per record)
//!   └──────┬──────┘
//!          │
//!          v
//!   ┌─────────────┐
//!   │ HTTP POST   │ (sequential, in order)
//!   └──────┬──────┘
//!          │ first failure aborts the rest
//!          v
//!   Ok(()) | Err(UploadError { index })
//! ```
//!
//! # Delivery guarantee
//!
//! A batch either succeeds as a whole or fails as a whole. Records sent before
//! the failing one are not tracked individually, so a durable caller that
//! re-sends the failed batch delivers them again: at-least-once, with possible
//! duplicates at the collector.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::debug;

use crate::error::UploadError;
use crate::record::LogRecord;

/// Ships a batch of records, all or nothing.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Sends `records` in order. Returns an error describing the first
    /// record that could not be delivered; nothing after it was attempted.
    async fn upload(&self, records: &[LogRecord]) -> Result<(), UploadError>;
}

/// Uploader issuing one JSON POST per record.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl HttpUploader {
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            client,
            endpoint: endpoint.into(),
            headers,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, index: usize, record: &LogRecord) -> Result<(), UploadError> {
        let body = serde_json::to_vec(record)
            .map_err(|source| UploadError::Serialization { index, source })?;

        let resp = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await
            .map_err(|source| UploadError::Transport { index, source })?;

        // The response body is never interpreted, only the status.
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(UploadError::Status { index, status })
        }
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, records: &[LogRecord]) -> Result<(), UploadError> {
        for (index, record) in records.iter().enumerate() {
            self.send(index, record).await?;
        }
        debug!("LOGS | Uploaded {} records", records.len());
        Ok(())
    }
}
