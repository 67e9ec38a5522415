// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversion of raw Laravel log lines into [`LogEvent`]s.
//!
//! Lines follow a fixed grammar:
//!
//! ```text
//! [2016-04-16 17:26:00] local.INFO: Example data {"foo": "Test", "bar": true}
//!  └──── timestamp ────┘ └env┘└lvl┘ └─ message (with optional JSON payloads) ─┘
//! ```
//!
//! Anything else yields no event. Consecutive duplicate events are dropped.

pub mod payload;
pub mod timestamp;

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::trace;

use crate::event::{LogEvent, Payload};
use timestamp::{DateFormat, Zone, LOG_DATETIME_FORMAT};

/// `[timestamp] environment.LEVEL: message`
const LOG_EXPR: &str = r"^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\] (.*?)\.(.*?): (.*)";

#[allow(clippy::expect_used)]
fn log_expr() -> &'static Regex {
    static LOG_REGEX: OnceLock<Regex> = OnceLock::new();
    LOG_REGEX.get_or_init(|| Regex::new(LOG_EXPR).expect("log expression is valid"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// Zone the timestamps in the log were written in.
    pub source_zone: Zone,
    /// Zone to render timestamps in; `None` keeps the source zone.
    pub target_zone: Option<Zone>,
    pub date_format: DateFormat,
    /// Decode extracted payloads into `parameters`.
    pub smart: bool,
}

/// Stateful line parser.
///
/// Remembers the last emitted event so a line repeated back to back is only
/// forwarded once.
#[derive(Debug)]
pub struct LogParser {
    config: ParserConfig,
    last_event: Option<LogEvent>,
}

impl LogParser {
    #[must_use]
    pub fn new(config: ParserConfig) -> Self {
        LogParser {
            config,
            last_event: None,
        }
    }

    /// Parses a raw line.
    ///
    /// Returns `None` for empty lines, lines outside the grammar and events
    /// equal to the previously returned one.
    pub fn parse(&mut self, line: &str) -> Option<LogEvent> {
        let event = self.build(line)?;

        if self.last_event.as_ref() == Some(&event) {
            trace!("Skipping repeated log event");
            return None;
        }

        self.last_event = Some(event.clone());
        Some(event)
    }

    fn build(&self, line: &str) -> Option<LogEvent> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return None;
        }

        let captures = log_expr().captures(line)?;
        let (raw_time, environment, level, message) = (
            captures.get(1)?.as_str(),
            captures.get(2)?.as_str(),
            captures.get(3)?.as_str(),
            captures.get(4)?.as_str(),
        );

        let naive = match NaiveDateTime::parse_from_str(raw_time, LOG_DATETIME_FORMAT) {
            Ok(naive) => naive,
            Err(e) => {
                trace!("Skipping line with invalid timestamp {raw_time}: {e}");
                return None;
            }
        };

        let mut instant = self.config.source_zone.localize(&naive);
        let render_zone = match &self.config.target_zone {
            Some(zone) => {
                instant = zone.convert(&instant);
                *zone
            }
            None => self.config.source_zone,
        };
        let timestamp = self.config.date_format.render(&instant, &render_zone);

        let (message, spans) = payload::extract(message);
        let parameters = if self.config.smart {
            decode_parameters(&spans)
        } else {
            None
        };

        Some(LogEvent {
            timestamp,
            environment: environment.to_string(),
            level: level.to_string(),
            message: message.trim().to_string(),
            data: Payload::from_spans(spans),
            parameters,
            hostname: None,
        })
    }
}

/// One payload decodes into its value; several decode into the list of those
/// that are valid JSON. Invalid payloads are dropped silently.
fn decode_parameters(spans: &[String]) -> Option<Value> {
    match spans {
        [] => None,
        [single] => serde_json::from_str(single).ok(),
        many => Some(Value::Array(
            many.iter()
                .filter_map(|span| serde_json::from_str(span).ok())
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Timestamp;
    use serde_json::json;

    const HELLO: &str = "[2016-04-16 17:25:45] local.INFO: Hello logstash";
    const EXAMPLE: &str =
        r#"[2016-04-16 17:26:00] local.INFO: Example data {"foo": "Test", "bar": true}"#;
    const MOUSTACHE: &str = r#"[2016-04-16 17:26:15] local.INFO: Example data2åñ {"foo": "Test", "bar": "{{ Moustache }}"}"#;

    fn gmt_parser(format: &str, smart: bool) -> LogParser {
        LogParser::new(ParserConfig {
            source_zone: "GMT".parse().unwrap(),
            target_zone: None,
            date_format: DateFormat::parse(format),
            smart,
        })
    }

    #[test]
    fn test_parse_laravel_log() {
        let mut parser = gmt_parser("Y-m-d\\TH:i:sP", false);

        let event = parser.parse(&format!("{HELLO}\n")).unwrap();
        assert_eq!(
            event.timestamp,
            Timestamp::Text("2016-04-16T17:25:45+00:00".to_string())
        );
        assert_eq!(event.environment, "local");
        assert_eq!(event.level, "INFO");
        assert_eq!(event.message, "Hello logstash");
        assert_eq!(event.data, None);

        let event = parser.parse(EXAMPLE).unwrap();
        assert_eq!(
            event.timestamp,
            Timestamp::Text("2016-04-16T17:26:00+00:00".to_string())
        );
        assert_eq!(event.message, "Example data");
        assert_eq!(
            event.data,
            Some(Payload::Single(r#"{"foo": "Test", "bar": true}"#.to_string()))
        );

        let event = parser.parse(MOUSTACHE).unwrap();
        assert_eq!(
            event.timestamp,
            Timestamp::Text("2016-04-16T17:26:15+00:00".to_string())
        );
        assert_eq!(event.message, "Example data2åñ");
        assert_eq!(
            event.data,
            Some(Payload::Single(
                r#"{"foo": "Test", "bar": "{{ Moustache }}"}"#.to_string()
            ))
        );
    }

    #[test]
    fn test_end_to_end_event_shape() {
        let mut parser = gmt_parser("Y-m-d\\TH:i:sP", false);
        let event = parser.parse(EXAMPLE).unwrap();
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "timestamp": "2016-04-16T17:26:00+00:00",
                "environment": "local",
                "level": "INFO",
                "message": "Example data",
                "data": "{\"foo\": \"Test\", \"bar\": true}",
            })
        );
    }

    #[test]
    fn test_rejects_empty_and_foreign_lines() {
        let mut parser = gmt_parser("epoch", false);
        assert!(parser.parse("").is_none());
        assert!(parser.parse("\n").is_none());
        assert!(parser.parse("Stack trace:").is_none());
        assert!(parser.parse("#0 /var/www/app.php(12): main()").is_none());
        assert!(parser.parse("[2016-04-16] local.INFO: no time").is_none());
        assert!(parser.parse("[2016-02-30 10:00:00] local.INFO: bad date").is_none());
    }

    #[test]
    fn test_environment_and_level_are_lazy() {
        let mut parser = gmt_parser("epoch", false);
        let event = parser
            .parse("[2016-04-16 17:26:00] production.ERROR: Failed: db.host unreachable")
            .unwrap();
        assert_eq!(event.environment, "production");
        assert_eq!(event.level, "ERROR");
        assert_eq!(event.message, "Failed: db.host unreachable");
    }

    #[test]
    fn test_duplicate_lines_yield_one_event() {
        let mut parser = gmt_parser("Y-m-d\\TH:i:sP", false);
        assert!(parser.parse(EXAMPLE).is_some());
        assert!(parser.parse(EXAMPLE).is_none());
        assert!(parser.parse(HELLO).is_some());
        assert!(parser.parse(EXAMPLE).is_some());
    }

    #[test]
    fn test_unparsable_line_does_not_reset_dedup_memory() {
        let mut parser = gmt_parser("Y-m-d\\TH:i:sP", false);
        assert!(parser.parse(EXAMPLE).is_some());
        assert!(parser.parse("garbage").is_none());
        assert!(parser.parse(EXAMPLE).is_none());
    }

    #[test]
    fn test_smart_single_payload() {
        let mut parser = gmt_parser("epoch", true);
        let event = parser.parse(EXAMPLE).unwrap();
        assert_eq!(event.message, "Example data");
        assert_eq!(event.parameters, Some(json!({"foo": "Test", "bar": true})));
    }

    #[test]
    fn test_smart_multiple_payloads_drop_invalid() {
        let mut parser = gmt_parser("epoch", true);
        let event = parser
            .parse(r#"[2016-04-16 17:26:00] local.WARNING: two {"a": 1} and {"b": [true]} and {"c": oops}"#)
            .unwrap();
        assert_eq!(event.message, "two  and  and");
        assert_eq!(
            event.data,
            Some(Payload::Many(vec![
                r#"{"a": 1}"#.to_string(),
                r#"{"b": [true]}"#.to_string(),
                r#"{"c": oops}"#.to_string(),
            ]))
        );
        assert_eq!(event.parameters, Some(json!([{"a": 1}, {"b": [true]}])));
    }

    #[test]
    fn test_smart_invalid_single_payload() {
        let mut parser = gmt_parser("epoch", true);
        let event = parser
            .parse(r#"[2016-04-16 17:26:00] local.INFO: broken {"a": }"#)
            .unwrap();
        assert!(event.data.is_some());
        assert_eq!(event.parameters, None);
    }

    #[test]
    fn test_smart_off_leaves_parameters_empty() {
        let mut parser = gmt_parser("epoch", false);
        let event = parser.parse(EXAMPLE).unwrap();
        assert_eq!(event.parameters, None);
    }

    #[test]
    fn test_epoch_renders_event_time() {
        let mut parser = gmt_parser("epoch", false);
        let event = parser.parse(EXAMPLE).unwrap();
        assert_eq!(event.timestamp, Timestamp::Epoch(1_460_827_560_000));
    }

    #[test]
    fn test_timestamp_round_trip_after_conversion() {
        let mut parser = LogParser::new(ParserConfig {
            source_zone: "Europe/Madrid".parse().unwrap(),
            target_zone: Some("America/New_York".parse().unwrap()),
            date_format: DateFormat::parse("timestamp"),
            smart: false,
        });
        let event = parser.parse(EXAMPLE).unwrap();

        // 17:26 in Madrid (UTC+2 in April) is 15:26 UTC.
        let expected = chrono::DateTime::parse_from_rfc3339("2016-04-16T15:26:00+00:00")
            .unwrap()
            .timestamp();
        match event.timestamp {
            Timestamp::Epoch(seconds) => assert_eq!(seconds, expected),
            other => panic!("unexpected timestamp {other:?}"),
        }
    }

    #[test]
    fn test_target_zone_changes_rendered_offset() {
        let mut parser = LogParser::new(ParserConfig {
            source_zone: "UTC".parse().unwrap(),
            target_zone: Some("Europe/Madrid".parse().unwrap()),
            date_format: DateFormat::parse("Y-m-d H:i:s T"),
            smart: false,
        });
        let event = parser.parse(EXAMPLE).unwrap();
        assert_eq!(
            event.timestamp,
            Timestamp::Text("2016-04-16 19:26:00 CEST".to_string())
        );
    }
}
