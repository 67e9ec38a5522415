// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory sink for unit tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::Sink;
use crate::error::DispatchError;
use crate::event::LogEvent;

#[derive(Default)]
pub(crate) struct RecordingSink {
    batch_size: usize,
    fail: bool,
    delay: Option<Duration>,
    deliveries: Mutex<Vec<(String, Vec<LogEvent>)>>,
}

impl RecordingSink {
    pub(crate) fn new(batch_size: usize) -> Arc<Self> {
        Arc::new(RecordingSink {
            batch_size,
            ..Default::default()
        })
    }

    pub(crate) fn failing(batch_size: usize) -> Arc<Self> {
        Arc::new(RecordingSink {
            batch_size,
            fail: true,
            ..Default::default()
        })
    }

    /// Records each batch only after `delay` has elapsed.
    pub(crate) fn slow(batch_size: usize, delay: Duration) -> Arc<Self> {
        Arc::new(RecordingSink {
            batch_size,
            delay: Some(delay),
            ..Default::default()
        })
    }

    /// `(index, batch length)` per delivery, in delivery order.
    pub(crate) fn deliveries(&self) -> Vec<(String, usize)> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|(index, batch)| (index.clone(), batch.len()))
            .collect()
    }

    pub(crate) fn events(&self) -> Vec<LogEvent> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, batch)| batch.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn deliver(&self, index: &str, batch: Vec<LogEvent>) -> Result<(), DispatchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.deliveries
            .lock()
            .unwrap()
            .push((index.to_string(), batch));
        if self.fail {
            Err(DispatchError::NoHost)
        } else {
            Ok(())
        }
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn date_format(&self) -> &str {
        "epoch"
    }

    fn force_utc(&self) -> bool {
        true
    }
}
