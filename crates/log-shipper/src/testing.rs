// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Uploaders with scripted behaviour for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Notify;

use crate::error::UploadError;
use crate::record::LogRecord;
use crate::uploader::Uploader;

/// Records every batch it is handed. Each call consumes one scripted
/// outcome: `Some(index)` fails at that index, `None` succeeds. Calls beyond
/// the script succeed.
#[derive(Default)]
pub(crate) struct RecordingUploader {
    batches: Mutex<Vec<Vec<LogRecord>>>,
    script: Mutex<VecDeque<Option<usize>>>,
}

impl RecordingUploader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_script(script: impl IntoIterator<Item = Option<usize>>) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    pub(crate) fn batches(&self) -> Vec<Vec<LogRecord>> {
        self.batches.lock().unwrap().clone()
    }

    pub(crate) fn messages(&self) -> Vec<Vec<String>> {
        self.batches()
            .iter()
            .map(|batch| batch.iter().map(|r| r.message().to_string()).collect())
            .collect()
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, records: &[LogRecord]) -> Result<(), UploadError> {
        self.batches.lock().unwrap().push(records.to_vec());
        match self.script.lock().unwrap().pop_front().flatten() {
            Some(index) => Err(UploadError::Status {
                index,
                status: StatusCode::INTERNAL_SERVER_ERROR,
            }),
            None => Ok(()),
        }
    }
}

/// Parks every upload until the test releases it.
#[derive(Default)]
pub(crate) struct BlockingUploader {
    pub(crate) started: Notify,
    pub(crate) release: Notify,
    calls: AtomicUsize,
}

impl BlockingUploader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Uploader for BlockingUploader {
    async fn upload(&self, _records: &[LogRecord]) -> Result<(), UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(())
    }
}
