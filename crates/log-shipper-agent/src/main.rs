// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use log_shipper::{global, DeliveryMode, LogLevel, LogShipper, ShipperConfig};

const ENV_AGENT_TAG: &str = "LOG_SHIPPER_AGENT_TAG";
const ENV_LOG_LEVEL: &str = "LOG_SHIPPER_LOG_LEVEL";

#[tokio::main]
pub async fn main() {
    let log_level = env::var(ENV_LOG_LEVEL)
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match ShipperConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid log shipper configuration: {e}");
            return;
        }
    };
    let tag = env::var(ENV_AGENT_TAG)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| config.default_tag.clone());

    let handle = match LogShipper::new(config).start().await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Error starting log shipper: {e}");
            return;
        }
    };
    if let Err(e) = global::install(handle.sink()) {
        error!("Error installing log sink: {e}");
        return;
    }

    info!("log-shipper-agent: shipping standard input with tag {}", tag);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut shipped = 0u64;
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if ship_line(&tag, &line) {
                        shipped += 1;
                    }
                }
                Ok(None) => {
                    debug!("Standard input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read standard input: {e}");
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    info!("Accepted {} lines, shutting down", shipped);
    if handle.mode() == DeliveryMode::Durable {
        match handle.drain_now().await {
            Some(outcome) => debug!("Final drain finished: {:?}", outcome),
            None => warn!("Final drain not available"),
        }
    }
    if let Err(e) = handle.shutdown().await {
        error!("Log shipper did not stop cleanly: {e}");
    }
}

/// Logs one input line. Returns `false` for blank lines.
fn ship_line(tag: &str, line: &str) -> bool {
    let Some((level, message)) = parse_line(line) else {
        return false;
    };
    if let Err(e) = global::log(level, Some(tag), message, None) {
        error!("Dropping line: {e}");
        return false;
    }
    true
}

/// Splits an optional leading level word off a line.
///
/// `ERROR disk full`, `[warn] slow` and `DEBUG: retry` carry their level;
/// anything else is INFO with the whole line as the message.
fn parse_line(line: &str) -> Option<(LogLevel, &str)> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return None;
    }

    let trimmed = line.trim_start();
    let (first, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));
    let word = first.trim_matches(|c| c == '[' || c == ']' || c == ':');

    match LogLevel::parse(word) {
        Some(level) if !rest.trim().is_empty() => Some((level, rest.trim_start())),
        _ => Some((LogLevel::Info, line)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_plain_is_info() {
        assert_eq!(
            parse_line("user signed in"),
            Some((LogLevel::Info, "user signed in"))
        );
    }

    #[test]
    fn test_parse_line_level_prefixes() {
        assert_eq!(
            parse_line("ERROR disk full"),
            Some((LogLevel::Error, "disk full"))
        );
        assert_eq!(parse_line("[warn] slow"), Some((LogLevel::Warn, "slow")));
        assert_eq!(
            parse_line("DEBUG: retry 2"),
            Some((LogLevel::Debug, "retry 2"))
        );
        assert_eq!(
            parse_line("VERBOSE   frame 9"),
            Some((LogLevel::Verbose, "frame 9"))
        );
    }

    #[test]
    fn test_parse_line_level_word_alone_is_message() {
        assert_eq!(parse_line("ERROR"), Some((LogLevel::Info, "ERROR")));
    }

    #[test]
    fn test_parse_line_skips_blank() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   \t"), None);
    }
}
