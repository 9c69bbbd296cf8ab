// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide logging facade.
//!
//! Code that cannot thread a [`LogSink`] through its call graph installs one
//! here once at start-up. Logging before that is a wiring mistake and is
//! reported as [`ShipperError::NotInitialized`] rather than silently dropped.

use std::error::Error;
use std::sync::OnceLock;

use crate::error::ShipperError;
use crate::record::LogLevel;
use crate::sink::LogSink;

static SINK: OnceLock<LogSink> = OnceLock::new();

/// Installs the process-wide sink. Only the first call succeeds.
pub fn install(sink: LogSink) -> Result<(), ShipperError> {
    SINK.set(sink).map_err(|_| ShipperError::AlreadyInitialized)
}

#[must_use]
pub fn is_installed() -> bool {
    SINK.get().is_some()
}

fn sink() -> Result<&'static LogSink, ShipperError> {
    SINK.get().ok_or(ShipperError::NotInitialized)
}

pub fn log(
    level: LogLevel,
    tag: Option<&str>,
    message: &str,
    error: Option<&(dyn Error + 'static)>,
) -> Result<(), ShipperError> {
    sink()?.log(level, tag, message, error);
    Ok(())
}

pub fn error(tag: Option<&str>, message: &str) -> Result<(), ShipperError> {
    log(LogLevel::Error, tag, message, None)
}

pub fn warn(tag: Option<&str>, message: &str) -> Result<(), ShipperError> {
    log(LogLevel::Warn, tag, message, None)
}

pub fn info(tag: Option<&str>, message: &str) -> Result<(), ShipperError> {
    log(LogLevel::Info, tag, message, None)
}

pub fn debug(tag: Option<&str>, message: &str) -> Result<(), ShipperError> {
    log(LogLevel::Debug, tag, message, None)
}

pub fn verbose(tag: Option<&str>, message: &str) -> Result<(), ShipperError> {
    log(LogLevel::Verbose, tag, message, None)
}
