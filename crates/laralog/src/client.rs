// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared HTTP client for the network sinks.

use std::time::Duration;

use crate::constants::REQUEST_TIMEOUT;
use crate::error::ConfigError;

/// Immutable client settings captured once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub hosts: Vec<String>,
    /// Extra attempts after the first failed one.
    pub retries: u32,
    pub verify_certificates: bool,
    pub batch_size: usize,
    pub async_dispatch: bool,
}

/// One persistent connection pool, built from a [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct Client {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let inner = build_client(&config, REQUEST_TIMEOUT)?;
        Ok(Client { inner, config })
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

fn build_client(config: &ClientConfig, timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .pool_max_idle_per_host(config.batch_size.max(1))
        .tcp_keepalive(Some(Duration::from_secs(120)))
        .danger_accept_invalid_certs(!config.verify_certificates)
        .build()?;
    Ok(client)
}
