// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors surfaced by the shipper's lifecycle and configuration.
#[derive(Debug, thiserror::Error)]
pub enum ShipperError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Log shipper not initialized, install a sink before logging")]
    NotInitialized,

    #[error("Log shipper already initialized")]
    AlreadyInitialized,

    #[error("Durable store error: {0}")]
    Store(#[from] StoreError),

    #[error("Shutdown timeout exceeded")]
    ShutdownTimeout,
}

/// Errors raised by durable store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sled::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored key has unexpected length {0}")]
    CorruptKey(usize),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Failure of a batch upload. `index` is the position of the record that
/// failed, which is also the number of records delivered before the abort.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to serialize record {index}: {source}")]
    Serialization {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("transport failure on record {index}: {source}")]
    Transport {
        index: usize,
        #[source]
        source: reqwest::Error,
    },

    #[error("collector rejected record {index} with status {status}")]
    Status { index: usize, status: StatusCode },
}

impl UploadError {
    /// Number of records sent successfully before the failure.
    #[must_use]
    pub fn delivered(&self) -> usize {
        match self {
            UploadError::Serialization { index, .. }
            | UploadError::Transport { index, .. }
            | UploadError::Status { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ShipperError::InvalidConfig("endpoint URL cannot be empty".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: endpoint URL cannot be empty"
        );
    }

    #[test]
    fn test_store_error_converts_into_shipper_error() {
        let error: ShipperError = StoreError::Poisoned.into();
        assert!(matches!(error, ShipperError::Store(StoreError::Poisoned)));
        assert!(error.to_string().contains("store lock poisoned"));
    }

    #[test]
    fn test_upload_error_delivered_count() {
        let error = UploadError::Status {
            index: 3,
            status: StatusCode::SERVICE_UNAVAILABLE,
        };
        assert_eq!(error.delivered(), 3);
        assert!(error.to_string().contains("503"));
    }

    #[test]
    fn test_not_initialized_debug() {
        let debug_str = format!("{:?}", ShipperError::NotInitialized);
        assert!(debug_str.contains("NotInitialized"));
    }
}
