// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Diagnostic logging for the forwarder itself.
//!
//! Lines go to stderr so they never interleave with events printed by the
//! console sink or verbose mode:
//!
//! ```text
//! LARALOG | INFO | Tailing storage/logs/laravel.log
//! LARALOG | ERROR | Unable to send logs: 503 Service Unavailable: ...
//! ```

use std::env;
use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log level or a full filter directive.
pub const LOG_LEVEL_ENV: &str = "LARALOG_LOG_LEVEL";

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "LARALOG | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Filter directive for `level`, silencing the HTTP stack below it.
fn filter_directive(level: &str) -> String {
    format!("h2=off,hyper=off,rustls=off,{level}")
}

/// Installs the global subscriber. Invalid levels fall back to `info`.
pub fn init() {
    let level = env::var(LOG_LEVEL_ENV)
        .map(|val| val.to_lowercase())
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

    let filter = EnvFilter::try_new(filter_directive(&level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(DEFAULT_LOG_LEVEL)));

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .event_format(Formatter)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("LARALOG | WARN | a global logger was already installed");
    }
}
