// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client construction for the uploader.
//!
//! The client carries the request timeout from the configuration, so a call
//! that hangs past it surfaces as a transport error. An invalid proxy falls
//! back to a direct connection, and a builder failure falls back to reqwest's
//! defaults, so shipping can always start.

use std::error::Error;
use std::time::Duration;

use tracing::error;

use crate::config::ShipperConfig;

/// Creates the HTTP client used to reach the collector.
#[must_use]
pub fn get_client(config: &ShipperConfig) -> reqwest::Client {
    match build_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "LOGS | Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match build_client(config, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "LOGS | Failed to build HTTP client without proxy: {}, using defaults",
                        inner
                    );
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(
    config: &ShipperConfig,
    allow_proxy: bool,
) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_uri) = &config.https_proxy {
            client = client.proxy(reqwest::Proxy::https(https_uri.clone())?);
        }
    }

    Ok(client.build()?)
}
