// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The log record value shipped to the collector.
//!
//! A [`LogRecord`] is created once by the sink and never mutated afterwards.
//! The only change it ever sees is the durable store attaching the id it was
//! persisted under, which consumes the value and returns a new one.
//!
//! The wire form carries exactly four fields:
//!
//! ```text
//! {"@timestamp":"2024-05-01T10:00:00.123Z","level":"INFO","tag":"App","message":"hello"}
//! ```

use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

/// Millisecond precision UTC timestamp, e.g. `2024-05-01T10:00:00.123Z`.
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Verbose,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
        }
    }

    /// Parses a level name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Some(LogLevel::Error),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "INFO" => Some(LogLevel::Info),
            "DEBUG" => Some(LogLevel::Debug),
            "VERBOSE" | "TRACE" => Some(LogLevel::Verbose),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => LogLevel::Error,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::TRACE => LogLevel::Verbose,
        }
    }
}

/// A single structured log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Assigned by the durable store; never part of the wire body.
    #[serde(skip)]
    id: Option<u64>,
    #[serde(rename = "@timestamp")]
    timestamp: String,
    level: LogLevel,
    tag: String,
    message: String,
}

impl LogRecord {
    /// Creates a record stamped with the current UTC time.
    pub fn new(level: LogLevel, tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_timestamp(now_timestamp(), level, tag, message)
    }

    /// Creates a record with an explicit timestamp (used when rehydrating
    /// stored records and in tests).
    pub fn with_timestamp(
        timestamp: impl Into<String>,
        level: LogLevel,
        tag: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            timestamp: timestamp.into(),
            level,
            tag: tag.into(),
            message: message.into(),
        }
    }

    /// Returns the same record tagged with the id it was stored under.
    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Formats the current UTC time the way records carry it.
#[must_use]
pub fn now_timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| format!("{}", now.unix_timestamp()))
}

/// Builds the message body for a record, appending the rendered error chain
/// when an error accompanies the log call.
///
/// Each `source()` in the chain lands on its own `Caused by:` line, which is
/// the closest thing to a stack trace an error value carries.
#[must_use]
pub fn render_message(message: &str, error: Option<&(dyn Error + 'static)>) -> String {
    let Some(error) = error else {
        return message.to_string();
    };

    let mut rendered = String::with_capacity(message.len() + 64);
    rendered.push_str(message);
    rendered.push('\n');
    rendered.push_str(&error.to_string());

    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\nCaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
