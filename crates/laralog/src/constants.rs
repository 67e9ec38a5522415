// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Defaults and limits shared across the forwarder.

use std::time::Duration;

/// Stream/index name used when `--index` is not given.
pub const DEFAULT_INDEX: &str = "laravel";

/// Driver used when `--sender` is not given.
pub const DEFAULT_SENDER: &str = "elastic_search";

/// Marker for standard input, kept compatible with existing deployments.
pub const STDIN_MARKER: &str = "php://stdin";

pub const DEFAULT_BATCH_SIZE: usize = 10;

pub const DEFAULT_RETRIES: u32 = 2;

/// Scheduler period in milliseconds.
pub const DEFAULT_READ_FREQ_MS: u64 = 500;

/// Minimum time between two reads of a tailed file.
pub const DEFAULT_TAIL_INTERVAL: Duration = Duration::from_millis(500);

/// Longest line handed to the parser; longer lines are split.
pub const MAX_LINE_LENGTH: usize = 32_768;

/// Maximum number of log events per request accepted by the Datadog HTTP intake.
pub const DATADOG_MAX_BATCH_SIZE: usize = 50;

/// Document type written by the search backend sink.
pub const ELASTIC_SEARCH_DOC_TYPE: &str = "log";

/// Upper bound on a single outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown waits for asynchronous dispatches still in flight.
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Separator printed by the console sink after every event.
pub const CONSOLE_SEPARATOR: &str = "=============================================";

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// Terminated by the hang up signal.
pub const EXIT_HUP: i32 = 129;
/// Terminated by Control-C.
pub const EXIT_CTRLC: i32 = 130;
