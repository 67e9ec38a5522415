// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::Mutex;

use super::Sink;
use crate::constants::CONSOLE_SEPARATOR;
use crate::error::DispatchError;
use crate::event::LogEvent;

/// Prints every event to the console, followed by a separator line.
pub struct StdoutSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl StdoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        StdoutSink {
            out: Mutex::new(Box::new(writer)),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn deliver(&self, index: &str, batch: Vec<LogEvent>) -> Result<(), DispatchError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("console writer lock poisoned"))?;

        for event in &batch {
            let json = serde_json::to_string(event)?;
            writeln!(out, "{index}")?;
            writeln!(out, "{json}")?;
            writeln!(out, "{CONSOLE_SEPARATOR}")?;
        }
        out.flush()?;
        Ok(())
    }

    fn batch_size(&self) -> usize {
        1
    }

    fn date_format(&self) -> &str {
        "epoch"
    }

    fn force_utc(&self) -> bool {
        true
    }
}
