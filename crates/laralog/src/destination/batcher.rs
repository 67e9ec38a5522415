// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, warn, Instrument};

use super::Sink;
use crate::constants::SHUTDOWN_DRAIN_TIMEOUT;
use crate::error::DispatchError;
use crate::event::LogEvent;

/// Per-index queues in front of a [`Sink`].
///
/// Each queue is flushed once it holds `batch_size` events, and every queue
/// still holding events is flushed at shutdown. A queue is emptied by every
/// flush whatever the outcome: failed events are not retried later.
pub struct Batcher {
    sink: Arc<dyn Sink>,
    queues: HashMap<String, Vec<LogEvent>>,
    async_dispatch: bool,
    in_flight: JoinSet<()>,
    drain_timeout: Duration,
}

impl Batcher {
    #[must_use]
    pub fn new(sink: Arc<dyn Sink>, async_dispatch: bool) -> Self {
        Batcher {
            sink,
            queues: HashMap::new(),
            async_dispatch,
            in_flight: JoinSet::new(),
            drain_timeout: SHUTDOWN_DRAIN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Whether flushes are delivered in the background.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.async_dispatch
    }

    /// Number of events waiting under `index`.
    #[must_use]
    pub fn pending(&self, index: &str) -> usize {
        self.queues.get(index).map_or(0, Vec::len)
    }

    /// Queues `event` and flushes the queue once it reaches the batch size.
    pub async fn send(&mut self, index: &str, event: LogEvent) -> Result<(), DispatchError> {
        let queue = self.queues.entry(index.to_string()).or_default();
        queue.push(event);

        if queue.len() >= self.sink.batch_size().max(1) {
            self.flush(index).await
        } else {
            Ok(())
        }
    }

    /// Dispatches the queue for `index`.
    ///
    /// In async mode the delivery runs in the background and its failures are
    /// only logged.
    pub async fn flush(&mut self, index: &str) -> Result<(), DispatchError> {
        self.reap();

        let batch = match self.queues.get_mut(index) {
            Some(queue) if !queue.is_empty() => std::mem::take(queue),
            _ => return Ok(()),
        };

        if !self.async_dispatch {
            return self.sink.deliver(index, batch).await;
        }

        let sink = Arc::clone(&self.sink);
        let index = index.to_string();
        self.in_flight.spawn(
            async move {
                if let Err(e) = sink.deliver(&index, batch).await {
                    error!("Unable to send logs: {}", e);
                }
            }
            .in_current_span(),
        );
        Ok(())
    }

    /// Flushes every non-empty queue once, synchronously, then waits for
    /// background deliveries still in flight.
    pub async fn shutdown(&mut self) -> Result<(), DispatchError> {
        let pending: Vec<(String, Vec<LogEvent>)> = self
            .queues
            .iter_mut()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(index, queue)| (index.clone(), std::mem::take(queue)))
            .collect();

        let total = pending.len();
        let mut failed = 0;
        let mut last = None;
        for (index, batch) in pending {
            debug!("Flushing {} pending events for {}", batch.len(), index);
            if let Err(e) = self.sink.deliver(&index, batch).await {
                failed += 1;
                last = Some(e);
            }
        }

        self.drain().await;

        match last {
            None => Ok(()),
            Some(e) if failed == 1 => Err(e),
            Some(e) => Err(DispatchError::Partial {
                failed,
                total,
                last: Box::new(e),
            }),
        }
    }

    async fn drain(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }

        let in_flight = &mut self.in_flight;
        let wait = async {
            while in_flight.join_next().await.is_some() {}
        };
        if tokio::time::timeout(self.drain_timeout, wait).await.is_err() {
            warn!(
                "Gave up waiting for {} in-flight deliveries",
                self.in_flight.len()
            );
            self.in_flight.abort_all();
        }
    }

    /// Drops the results of background deliveries that already finished.
    fn reap(&mut self) {
        while let Some(Some(result)) = self.in_flight.join_next().now_or_never() {
            if let Err(e) = result {
                debug!("Delivery task failed to complete: {}", e);
            }
        }
    }
}
