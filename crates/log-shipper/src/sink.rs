// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Producer entry point.
//!
//! A [`LogSink`] is cheap to clone and can be used from any thread or task.
//! Logging never waits: the record is built on the caller's thread and handed
//! to an unbounded channel, either the store writer (durable mode) or the
//! volatile queue. If the shipper has already stopped the record is dropped
//! and the caller is not told.

use std::error::Error;
use std::sync::Arc;

use tracing::debug;

use crate::config::DeliveryMode;
use crate::queue::VolatileSender;
use crate::record::{render_message, LogLevel, LogRecord};
use crate::writer::StoreWriterHandle;

#[derive(Clone, Debug)]
enum Route {
    Durable(StoreWriterHandle),
    Volatile(VolatileSender),
}

/// Cloneable handle that accepts log events.
#[derive(Clone, Debug)]
pub struct LogSink {
    route: Route,
    default_tag: Arc<str>,
}

impl LogSink {
    pub(crate) fn durable(writer: StoreWriterHandle, default_tag: &str) -> Self {
        Self {
            route: Route::Durable(writer),
            default_tag: Arc::from(default_tag),
        }
    }

    pub(crate) fn volatile(sender: VolatileSender, default_tag: &str) -> Self {
        Self {
            route: Route::Volatile(sender),
            default_tag: Arc::from(default_tag),
        }
    }

    #[must_use]
    pub fn mode(&self) -> DeliveryMode {
        match self.route {
            Route::Durable(_) => DeliveryMode::Durable,
            Route::Volatile(_) => DeliveryMode::Volatile,
        }
    }

    #[must_use]
    pub fn default_tag(&self) -> &str {
        &self.default_tag
    }

    /// Records one event. `tag` falls back to the configured default; an
    /// accompanying `error` is rendered with its cause chain after the
    /// message.
    pub fn log(
        &self,
        level: LogLevel,
        tag: Option<&str>,
        message: &str,
        error: Option<&(dyn Error + 'static)>,
    ) {
        let tag = tag.unwrap_or(self.default_tag());
        let record = LogRecord::new(level, tag, render_message(message, error));

        let accepted = match &self.route {
            Route::Durable(writer) => writer.insert(record),
            Route::Volatile(sender) => sender.send(record).is_ok(),
        };
        if !accepted {
            debug!("LOGS | Shipper stopped, dropping {} record", level);
        }
    }

    pub fn error(&self, tag: Option<&str>, message: &str) {
        self.log(LogLevel::Error, tag, message, None);
    }

    /// Logs at ERROR with the error's cause chain appended to `message`.
    pub fn error_with(&self, tag: Option<&str>, message: &str, error: &(dyn Error + 'static)) {
        self.log(LogLevel::Error, tag, message, Some(error));
    }

    pub fn warn(&self, tag: Option<&str>, message: &str) {
        self.log(LogLevel::Warn, tag, message, None);
    }

    pub fn info(&self, tag: Option<&str>, message: &str) {
        self.log(LogLevel::Info, tag, message, None);
    }

    pub fn debug(&self, tag: Option<&str>, message: &str) {
        self.log(LogLevel::Debug, tag, message, None);
    }

    pub fn verbose(&self, tag: Option<&str>, message: &str) {
        self.log(LogLevel::Verbose, tag, message, None);
    }
}
