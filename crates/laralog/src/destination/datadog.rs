// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Datadog HTTP intake sink.
//!
//! Every flush becomes a single request against the first host:
//!
//! ```text
//! POST {host}?ddsource=log&service={index}&hostname={hostname}
//! Content-Type: application/json
//!
//! [{"timestamp": 1460827560000, "level": "INFO", ...}, ...]
//! ```
//!
//! Transport errors and server errors are retried; client errors are not.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Instant;
use tracing::{debug, error};

use super::{normalize_host, Sink};
use crate::client::Client;
use crate::constants::DATADOG_MAX_BATCH_SIZE;
use crate::error::DispatchError;
use crate::event::LogEvent;

pub struct DatadogSink {
    client: Client,
    endpoint: Option<String>,
}

impl DatadogSink {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let endpoint = client.config().hosts.first().map(|host| normalize_host(host));
        DatadogSink { client, endpoint }
    }
}

#[async_trait]
impl Sink for DatadogSink {
    async fn deliver(&self, index: &str, batch: Vec<LogEvent>) -> Result<(), DispatchError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(DispatchError::NoHost);
        };

        let hostname = batch
            .first()
            .and_then(|event| event.hostname.clone())
            .unwrap_or_default();
        let body = serde_json::to_vec(&batch)?;

        let request = || {
            self.client
                .http()
                .post(endpoint)
                .query(&[
                    ("ddsource", "log"),
                    ("service", index),
                    ("hostname", hostname.as_str()),
                ])
                .header("Content-Type", "application/json")
                .body(body.clone())
        };

        let max_attempts = self.client.config().retries + 1;
        let mut attempts = 0;

        loop {
            let time = Instant::now();
            attempts += 1;
            let response = request().send().await;
            let elapsed = time.elapsed();

            let failure = match response {
                Ok(response) if response.status().is_success() => {
                    debug!(
                        "Sent {} events for {} in {} ms",
                        batch.len(),
                        index,
                        elapsed.as_millis()
                    );
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if status == StatusCode::FORBIDDEN {
                        error!("Request was denied by Datadog: Access denied. Please verify the intake URL and API key.");
                    }
                    let failure = DispatchError::Status { status, body };
                    if status.is_client_error() {
                        return Err(failure);
                    }
                    failure
                }
                Err(e) => DispatchError::Transport(e),
            };

            if attempts >= max_attempts {
                debug!(
                    "Failed to send request after {} ms and {} attempts: {}",
                    elapsed.as_millis(),
                    attempts,
                    failure
                );
                return Err(failure);
            }
        }
    }

    /// Capped to what the intake accepts per request.
    fn batch_size(&self) -> usize {
        self.client
            .config()
            .batch_size
            .clamp(1, DATADOG_MAX_BATCH_SIZE)
    }

    fn date_format(&self) -> &str {
        "epoch"
    }

    fn force_utc(&self) -> bool {
        true
    }
}
