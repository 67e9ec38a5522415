// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structured log event produced by the parser and shipped by the sinks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rendered event time.
///
/// Serialized as a bare string or number so sinks receive exactly what the
/// configured format asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Formatted date string, e.g. `2016-04-16T17:26:00+00:00`.
    Text(String),
    /// Milliseconds (`epoch`) or seconds (`timestamp`) since the Unix epoch.
    Epoch(i64),
}

/// JSON-looking substrings extracted from a message, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Single(String),
    Many(Vec<String>),
}

impl Payload {
    /// Builds the payload field from the extracted spans, `None` when nothing was found.
    #[must_use]
    pub fn from_spans(mut spans: Vec<String>) -> Option<Self> {
        match spans.len() {
            0 => None,
            1 => spans.pop().map(Payload::Single),
            _ => Some(Payload::Many(spans)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: Timestamp,
    pub environment: String,
    pub level: String,
    pub message: String,
    /// Raw payload; `null` when the message carried none.
    pub data: Option<Payload>,
    /// Decoded payload, only present in smart mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}
