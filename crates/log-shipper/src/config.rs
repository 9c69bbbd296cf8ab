// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants;
use crate::error::ShipperError;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const ENV_USE_PERSISTENCE: &str = "LOG_SHIPPER_USE_PERSISTENCE";
const ENV_ENDPOINT_URL: &str = "LOG_SHIPPER_ENDPOINT_URL";
const ENV_INTERVAL_MS: &str = "LOG_SHIPPER_INTERVAL_MS";
const ENV_BATCH_LIMIT: &str = "LOG_SHIPPER_BATCH_LIMIT";
const ENV_FLUSH_TIMEOUT_MS: &str = "LOG_SHIPPER_FLUSH_TIMEOUT_MS";
const ENV_REQUEST_TIMEOUT_MS: &str = "LOG_SHIPPER_REQUEST_TIMEOUT_MS";
const ENV_RETRY_BACKOFF_MS: &str = "LOG_SHIPPER_RETRY_BACKOFF_MS";
const ENV_SHUTDOWN_TIMEOUT_MS: &str = "LOG_SHIPPER_SHUTDOWN_TIMEOUT_MS";
const ENV_STORE_PATH: &str = "LOG_SHIPPER_STORE_PATH";
const ENV_DEFAULT_TAG: &str = "LOG_SHIPPER_DEFAULT_TAG";
const ENV_JOB_NAME: &str = "LOG_SHIPPER_JOB_NAME";
const ENV_PROXY_HTTPS: &str = "LOG_SHIPPER_PROXY_HTTPS";
const ENV_HTTPS_PROXY: &str = "HTTPS_PROXY";
const ENV_LOG_LEVEL: &str = "LOG_SHIPPER_LOG_LEVEL";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Which queue records travel through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Persisted in the durable store, drained by the periodic job.
    Durable,
    /// Held in memory, flushed by the collect/flush loop. Lost on crash.
    Volatile,
}

/// Configuration for the log shipper.
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    /// Selects durable (persisted) or volatile (in-memory) delivery
    pub use_persistence: bool,
    /// Collector URL every record is POSTed to
    pub endpoint_url: String,
    /// Period of the durable drain job
    pub interval: Duration,
    /// Records per batch; `None` picks the per-mode default
    pub batch_limit: Option<usize>,
    /// Idle time before a partial volatile buffer is flushed
    pub flush_timeout: Duration,
    /// Timeout applied to each outbound request
    pub request_timeout: Duration,
    /// First retry delay after a failed durable drain
    pub retry_backoff: Duration,
    /// How long shutdown waits for in-flight work
    pub shutdown_timeout: Duration,
    /// Location of the durable store
    pub store_path: PathBuf,
    /// Tag applied when a log call omits one
    pub default_tag: String,
    /// Unique name of the durable drain job
    pub job_name: String,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level of the shipper's own diagnostics (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            use_persistence: false,
            endpoint_url: constants::DEFAULT_ENDPOINT_URL.to_string(),
            interval: constants::DEFAULT_INTERVAL,
            batch_limit: None,
            flush_timeout: constants::DEFAULT_FLUSH_TIMEOUT,
            request_timeout: constants::DEFAULT_REQUEST_TIMEOUT,
            retry_backoff: constants::DEFAULT_RETRY_BACKOFF,
            shutdown_timeout: constants::DEFAULT_SHUTDOWN_TIMEOUT,
            store_path: PathBuf::from(constants::DEFAULT_STORE_PATH),
            default_tag: constants::DEFAULT_TAG.to_string(),
            job_name: constants::DEFAULT_JOB_NAME.to_string(),
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

impl ShipperConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ShipperError> {
        Self::from_env_iter(env::vars())
    }

    /// Builds the configuration from key/value pairs (typically for tests).
    pub fn from_env_iter<I, K, V>(iter: I) -> Result<Self, ShipperError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let defaults = Self::default();

        let use_persistence = parse_bool(
            map.get(ENV_USE_PERSISTENCE).map(String::as_str),
            defaults.use_persistence,
        );
        let endpoint_url = map
            .get(ENV_ENDPOINT_URL)
            .map(|val| val.trim().to_string())
            .unwrap_or(defaults.endpoint_url);
        let batch_limit = map
            .get(ENV_BATCH_LIMIT)
            .and_then(|val| val.trim().parse::<usize>().ok());
        let store_path = map
            .get(ENV_STORE_PATH)
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);
        let default_tag = map
            .get(ENV_DEFAULT_TAG)
            .filter(|val| !val.trim().is_empty())
            .cloned()
            .unwrap_or(defaults.default_tag);
        let job_name = map
            .get(ENV_JOB_NAME)
            .map(|val| val.trim().to_string())
            .unwrap_or(defaults.job_name);
        // The dedicated proxy variable wins over the generic one.
        let https_proxy = map
            .get(ENV_PROXY_HTTPS)
            .or_else(|| map.get(ENV_HTTPS_PROXY))
            .filter(|val| !val.trim().is_empty())
            .cloned();
        let log_level = map
            .get(ENV_LOG_LEVEL)
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            use_persistence,
            endpoint_url,
            interval: parse_millis(&map, ENV_INTERVAL_MS, defaults.interval),
            batch_limit,
            flush_timeout: parse_millis(&map, ENV_FLUSH_TIMEOUT_MS, defaults.flush_timeout),
            request_timeout: parse_millis(&map, ENV_REQUEST_TIMEOUT_MS, defaults.request_timeout),
            retry_backoff: parse_millis(&map, ENV_RETRY_BACKOFF_MS, defaults.retry_backoff),
            shutdown_timeout: parse_millis(
                &map,
                ENV_SHUTDOWN_TIMEOUT_MS,
                defaults.shutdown_timeout,
            ),
            store_path,
            default_tag,
            job_name,
            https_proxy,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ShipperError> {
        let endpoint = self.endpoint_url.trim();
        if endpoint.is_empty() {
            return Err(ShipperError::InvalidConfig(
                "endpoint URL cannot be empty".to_string(),
            ));
        }
        match reqwest::Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ShipperError::InvalidConfig(format!(
                    "endpoint URL must use http or https, got '{}'",
                    url.scheme()
                )));
            }
            Err(e) => {
                return Err(ShipperError::InvalidConfig(format!(
                    "invalid endpoint URL '{endpoint}': {e}"
                )));
            }
        }

        if self.interval.is_zero() {
            return Err(ShipperError::InvalidConfig(
                "drain interval must be greater than 0".to_string(),
            ));
        }
        if self.flush_timeout.is_zero() {
            return Err(ShipperError::InvalidConfig(
                "flush timeout must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ShipperError::InvalidConfig(
                "request timeout must be greater than 0".to_string(),
            ));
        }
        if self.batch_limit == Some(0) {
            return Err(ShipperError::InvalidConfig(
                "batch limit must be greater than 0".to_string(),
            ));
        }
        if self.job_name.trim().is_empty() {
            return Err(ShipperError::InvalidConfig(
                "job name cannot be empty".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ShipperError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn mode(&self) -> DeliveryMode {
        if self.use_persistence {
            DeliveryMode::Durable
        } else {
            DeliveryMode::Volatile
        }
    }

    /// Batch size in effect for the configured mode.
    #[must_use]
    pub fn effective_batch_limit(&self) -> usize {
        self.batch_limit.unwrap_or(match self.mode() {
            DeliveryMode::Durable => constants::DEFAULT_DURABLE_BATCH_LIMIT,
            DeliveryMode::Volatile => constants::DEFAULT_VOLATILE_BATCH_LIMIT,
        })
    }
}

fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "true" | "yes" | "1" | "on") => true,
        Some(v) if matches!(v.as_str(), "false" | "no" | "0" | "off") => false,
        _ => default,
    }
}

fn parse_millis(map: &HashMap<String, String>, key: &str, default: Duration) -> Duration {
    map.get(key)
        .and_then(|val| val.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
