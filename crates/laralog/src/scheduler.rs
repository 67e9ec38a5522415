// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Timer-driven poll loop and shutdown handling.

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::Client;
use crate::config::ForwarderConfig;
use crate::constants::{EXIT_CTRLC, EXIT_HUP, EXIT_SUCCESS};
use crate::destination::Batcher;
use crate::error::ConfigError;
use crate::parser::LogParser;
use crate::pipeline::EventFilter;
use crate::source::LogReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM
    Terminated,
    /// SIGINT or Control-C
    Interrupted,
    /// SIGHUP
    HangUp,
    /// Standard input was closed and fully drained.
    InputClosed,
    /// Stopped through the cancellation token.
    Cancelled,
}

impl ShutdownReason {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::Terminated | ShutdownReason::InputClosed | ShutdownReason::Cancelled => {
                EXIT_SUCCESS
            }
            ShutdownReason::Interrupted => EXIT_CTRLC,
            ShutdownReason::HangUp => EXIT_HUP,
        }
    }
}

pub struct Scheduler {
    reader: Box<dyn LogReader>,
    parser: LogParser,
    filter: EventFilter,
    batcher: Batcher,
    index: String,
    read_freq: Duration,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        reader: Box<dyn LogReader>,
        parser: LogParser,
        filter: EventFilter,
        batcher: Batcher,
        index: String,
        read_freq: Duration,
    ) -> Self {
        Scheduler {
            reader,
            parser,
            filter,
            batcher,
            index,
            read_freq,
        }
    }

    /// Wires source, parser, filter and sink together from a validated configuration.
    pub fn from_config(config: &ForwarderConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = Client::new(config.client_config())?;
        let async_dispatch = client.config().async_dispatch;
        let sink = config.sender.build(client);
        let parser = LogParser::new(config.parser_config(sink.as_ref()));
        let filter = EventFilter::new(
            config.ignore_levels.iter().cloned(),
            config.hostname.clone(),
            config.verbose,
        );
        let batcher = Batcher::new(sink, async_dispatch);
        let reader = config.input.open()?;

        debug!(
            "Forwarding {:?} to {} as {} (async: {})",
            config.input,
            config.sender,
            config.index,
            batcher.is_async()
        );

        Ok(Scheduler::new(
            reader,
            parser,
            filter,
            batcher,
            config.index.clone(),
            config.read_freq,
        ))
    }

    /// Processes every line currently available, in arrival order.
    pub async fn tick(&mut self) {
        for line in self.reader.read_lines() {
            let Some(event) = self.parser.parse(&line) else {
                continue;
            };
            let Some(event) = self.filter.apply(event) else {
                continue;
            };
            if let Err(e) = self.batcher.send(&self.index, event).await {
                error!("Unable to send logs: {}", e);
            }
        }
    }

    /// Polls until a signal arrives, input ends or `cancel` fires, then
    /// flushes every pending queue.
    pub async fn run(mut self, cancel: CancellationToken) -> ShutdownReason {
        let mut signals = Signals::new();
        let mut ticker = interval(self.read_freq);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                biased;
                reason = signals.recv() => break reason,
                () = cancel.cancelled() => break ShutdownReason::Cancelled,
                _ = ticker.tick() => {
                    self.tick().await;
                    if self.reader.is_exhausted() {
                        break ShutdownReason::InputClosed;
                    }
                }
            }
        };

        self.shutdown(reason).await;
        reason
    }

    async fn shutdown(&mut self, reason: ShutdownReason) {
        debug!("Shutting down: {:?}", reason);
        if let Err(e) = self.batcher.shutdown().await {
            error!("Unable to send logs: {}", e);
        }

        match reason {
            ShutdownReason::InputClosed | ShutdownReason::Cancelled => info!("Leaving..."),
            _ => info!("Exiting..."),
        }
    }
}

#[cfg(unix)]
struct Signals {
    terminate: Option<tokio::signal::unix::Signal>,
    interrupt: Option<tokio::signal::unix::Signal>,
    hangup: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl Signals {
    fn new() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let install = |kind: SignalKind, name: &str| match signal(kind) {
            Ok(signal) => Some(signal),
            Err(e) => {
                error!("Unable to listen for {}: {}", name, e);
                None
            }
        };

        Signals {
            terminate: install(SignalKind::terminate(), "SIGTERM"),
            interrupt: install(SignalKind::interrupt(), "SIGINT"),
            hangup: install(SignalKind::hangup(), "SIGHUP"),
        }
    }

    async fn recv(&mut self) -> ShutdownReason {
        async fn wait(signal: &mut Option<tokio::signal::unix::Signal>) {
            if let Some(signal) = signal {
                if signal.recv().await.is_some() {
                    return;
                }
            }
            std::future::pending().await
        }

        tokio::select! {
            () = wait(&mut self.terminate) => ShutdownReason::Terminated,
            () = wait(&mut self.interrupt) => ShutdownReason::Interrupted,
            () = wait(&mut self.hangup) => ShutdownReason::HangUp,
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn new() -> Self {
        Signals
    }

    async fn recv(&mut self) -> ShutdownReason {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ShutdownReason::Interrupted,
            Err(e) => {
                error!("Unable to listen for Control-C: {}", e);
                std::future::pending().await
            }
        }
    }
}
