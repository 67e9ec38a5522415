// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Tail an application log, turn its lines into structured events and forward
//! them to a search backend, a monitoring intake or the console.
//!
//! # Architecture
//!
//! ```text
//!        ┌──────────────┐
//!        │    Source    │  (file tailing or stdin)
//!        └──────┬───────┘
//!               │ raw lines
//!               v
//!        ┌──────────────┐
//!        │    Parser    │  (grammar, payloads, timestamps, dedup)
//!        └──────┬───────┘
//!               │ LogEvent
//!               v
//!        ┌──────────────┐
//!        │    Filter    │  (ignored levels, hostname, verbose echo)
//!        └──────┬───────┘
//!               │
//!               v
//!        ┌──────────────┐
//!        │   Batcher    │  (per-index queues, sync/async flush)
//!        └──────┬───────┘
//!               │
//!               v
//!   elastic_search | datadog | stdout
//! ```
//!
//! Everything is driven by the [`scheduler::Scheduler`] poll loop on a single
//! thread.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod client;
pub mod config;
pub mod constants;
pub mod destination;
pub mod error;
pub mod event;
pub mod hostname;
pub mod logger;
pub mod parser;
pub mod pipeline;
pub mod scheduler;
pub mod source;
