// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Search backend sink: one document-write request per event.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::{normalize_host, Sink};
use crate::client::Client;
use crate::constants::ELASTIC_SEARCH_DOC_TYPE;
use crate::error::DispatchError;
use crate::event::LogEvent;

const DATE_FORMAT: &str = "Y-m-d\\TH:i:sP";

pub struct ElasticSearchSink {
    client: Client,
    hosts: Vec<String>,
    next_host: AtomicUsize,
}

impl ElasticSearchSink {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let hosts = client
            .config()
            .hosts
            .iter()
            .map(|host| normalize_host(host))
            .collect();
        ElasticSearchSink {
            client,
            hosts,
            next_host: AtomicUsize::new(0),
        }
    }

    /// Writes one document, moving to the next host after each failed attempt.
    async fn index(&self, index: &str, event: &LogEvent) -> Result<(), DispatchError> {
        if self.hosts.is_empty() {
            return Err(DispatchError::NoHost);
        }

        let body = serde_json::to_vec(event)?;
        let attempts = self.client.config().retries + 1;
        let mut last_error = DispatchError::NoHost;

        for attempt in 1..=attempts {
            let slot = self.next_host.fetch_add(1, Ordering::Relaxed) % self.hosts.len();
            let host = &self.hosts[slot];
            let url = format!("{host}/{index}/{ELASTIC_SEARCH_DOC_TYPE}");

            let response = self
                .client
                .http()
                .post(&url)
                .header("Content-Type", "application/json")
                .body(body.clone())
                .send()
                .await;

            last_error = match response {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    DispatchError::Status { status, body }
                }
                Err(e) => DispatchError::Transport(e),
            };
            debug!("Attempt {attempt}/{attempts} to {url} failed: {last_error}");
        }

        Err(last_error)
    }
}

#[async_trait]
impl Sink for ElasticSearchSink {
    async fn deliver(&self, index: &str, batch: Vec<LogEvent>) -> Result<(), DispatchError> {
        let total = batch.len();
        let mut failed = 0;
        let mut last = None;

        for event in &batch {
            if let Err(e) = self.index(index, event).await {
                failed += 1;
                last = Some(e);
            }
        }

        match last {
            None => Ok(()),
            Some(e) if total == 1 => Err(e),
            Some(e) => Err(DispatchError::Partial {
                failed,
                total,
                last: Box::new(e),
            }),
        }
    }

    /// Documents are written one at a time.
    fn batch_size(&self) -> usize {
        1
    }

    fn date_format(&self) -> &str {
        DATE_FORMAT
    }

    fn force_utc(&self) -> bool {
        false
    }
}
