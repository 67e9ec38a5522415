// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;
use std::path::PathBuf;

/// Errors detected while turning command line input into a runnable configuration.
///
/// These are the only errors that stop the process; they are raised before the
/// scheduler starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Sender not available: {0}")]
    UnknownSender(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Unable to read hosts file {path}: {source}")]
    HostsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unable to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Errors raised while delivering a batch to a sink.
///
/// Never fatal: the scheduler logs them and keeps tailing.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status}: destination rejected payload: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write to console: {0}")]
    Console(#[from] std::io::Error),

    #[error("no host configured")]
    NoHost,

    #[error("{failed} of {total} requests failed, last error: {last}")]
    Partial {
        failed: usize,
        total: usize,
        last: Box<DispatchError>,
    },
}
