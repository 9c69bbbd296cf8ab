// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bridge from `tracing` events to a [`LogSink`].
//!
//! Installing [`ShipperLayer`] on a subscriber ships every application event
//! without touching the call sites. Two kinds of events are never shipped,
//! since shipping them would produce more of them:
//! - events raised while the shipper's own tasks run, marked with
//!   [`suppressed`];
//! - events from this crate and from the HTTP and storage stack it uploads
//!   and persists through, matched by target. Those crates drive connections
//!   on tasks of their own, outside any [`suppressed`] scope.

use std::fmt::{self, Write as _};
use std::future::Future;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::record::LogLevel;
use crate::sink::LogSink;

/// Target prefixes whose events are dropped.
const SUPPRESSED_TARGETS: &[&str] = &[
    "log_shipper",
    "h2",
    "hyper",
    "hyper_util",
    "reqwest",
    "rustls",
    "sled",
    "tower",
    "want",
];

tokio::task_local! {
    static SHIPPING: ();
}

/// Runs `future` with every `tracing` event it raises hidden from
/// [`ShipperLayer`].
pub(crate) async fn suppressed<F: Future>(future: F) -> F::Output {
    SHIPPING.scope((), future).await
}

fn in_shipper_task() -> bool {
    SHIPPING.try_with(|_| ()).is_ok()
}

pub struct ShipperLayer {
    sink: LogSink,
}

impl ShipperLayer {
    #[must_use]
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }
}

fn is_suppressed_target(target: &str) -> bool {
    SUPPRESSED_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

impl<S: Subscriber> Layer<S> for ShipperLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if in_shipper_task() || is_suppressed_target(metadata.target()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.sink.log(
            LogLevel::from(*metadata.level()),
            Some(metadata.target()),
            &visitor.finish(),
            None,
        );
    }
}

/// Collects the `message` field and renders the rest as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }

    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}
