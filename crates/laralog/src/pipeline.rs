// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::io::{self, Write};
use tracing::debug;

use crate::event::LogEvent;

/// Level filtering and hostname tagging applied between parser and sink.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    ignore_levels: HashSet<String>,
    hostname: String,
    verbose: bool,
}

impl EventFilter {
    #[must_use]
    pub fn new(ignore_levels: impl IntoIterator<Item = String>, hostname: String, verbose: bool) -> Self {
        EventFilter {
            ignore_levels: ignore_levels.into_iter().collect(),
            hostname,
            verbose,
        }
    }

    /// Drops ignored levels, tags the hostname and echoes the event in verbose mode.
    #[must_use]
    pub fn apply(&self, mut event: LogEvent) -> Option<LogEvent> {
        if self.ignore_levels.contains(&event.level) {
            return None;
        }

        event.hostname = Some(self.hostname.clone());

        if self.verbose {
            if let Err(e) = echo(&mut io::stdout().lock(), &event) {
                debug!("Unable to echo event: {}", e);
            }
        }

        Some(event)
    }
}

fn echo<W: Write>(out: &mut W, event: &LogEvent) -> io::Result<()> {
    let json = serde_json::to_string(event)?;
    writeln!(out, "{json}")
}
