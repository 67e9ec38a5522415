// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Destinations events are forwarded to.
//!
//! A [`Sink`] knows how to deliver one batch for one index. The [`Batcher`]
//! owns the per-index queues in front of it and decides when to flush.

pub mod batcher;
pub mod datadog;
pub mod elastic_search;
pub mod stdout;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::client::Client;
use crate::error::{ConfigError, DispatchError};
use crate::event::LogEvent;

pub use batcher::Batcher;

#[async_trait]
pub trait Sink: Send + Sync {
    /// Delivers `batch`, which was queued under `index`.
    async fn deliver(&self, index: &str, batch: Vec<LogEvent>) -> Result<(), DispatchError>;

    /// Number of queued events that triggers a flush.
    fn batch_size(&self) -> usize;

    /// Timestamp format the destination expects unless overridden.
    fn date_format(&self) -> &str;

    /// Whether timestamps must be rendered in UTC.
    fn force_utc(&self) -> bool;
}

/// Closed set of available drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderKind {
    ElasticSearch,
    Datadog,
    Stdout,
}

impl SenderKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SenderKind::ElasticSearch => "elastic_search",
            SenderKind::Datadog => "datadog",
            SenderKind::Stdout => "stdout",
        }
    }

    #[must_use]
    pub fn build(&self, client: Client) -> Arc<dyn Sink> {
        match self {
            SenderKind::ElasticSearch => Arc::new(elastic_search::ElasticSearchSink::new(client)),
            SenderKind::Datadog => Arc::new(datadog::DatadogSink::new(client)),
            SenderKind::Stdout => Arc::new(stdout::StdoutSink::new()),
        }
    }
}

impl FromStr for SenderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elastic_search" | "elasticsearch" => Ok(SenderKind::ElasticSearch),
            "datadog" => Ok(SenderKind::Datadog),
            "stdout" => Ok(SenderKind::Stdout),
            _ => Err(ConfigError::UnknownSender(s.to_string())),
        }
    }
}

impl fmt::Display for SenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Prefixes `http://` to scheme-less hosts and drops trailing slashes.
pub(crate) fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
