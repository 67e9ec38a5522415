// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Timezone handling and timestamp rendering.
//!
//! Log lines carry a naive `YYYY-MM-DD HH:MM:SS` time. It is interpreted in the
//! source [`Zone`], optionally converted to a target zone and rendered with a
//! [`DateFormat`]. Besides `epoch`, `timestamp` and strftime patterns, formats
//! use the PHP `date()` letters Laravel deployments already configure.

use chrono::format::{Item, StrftimeItems};
use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone,
    Timelike, Utc,
};
use chrono_tz::{OffsetComponents, Tz};
use std::fmt::Write;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::event::Timestamp;

/// Layout of the timestamp at the start of every log line.
pub const LOG_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Zone {
    /// The process' local zone.
    #[default]
    Local,
    /// An IANA zone such as `Europe/Madrid`, `UTC` or `GMT`.
    Named(Tz),
    /// A fixed offset such as `+02:00`.
    Fixed(FixedOffset),
}

impl FromStr for Zone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        if trimmed == "Z" {
            return Ok(Zone::Fixed(Utc.fix()));
        }
        if let Ok(tz) = trimmed.parse::<Tz>() {
            return Ok(Zone::Named(tz));
        }
        parse_offset(trimmed)
            .map(Zone::Fixed)
            .ok_or_else(|| ConfigError::UnknownTimezone(s.to_string()))
    }
}

/// Parses `+HH:MM`, `-HHMM` or `+HH`.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl Zone {
    /// Interprets a wall-clock time in this zone.
    ///
    /// Ambiguous times (DST fall back) resolve to the earliest instant. Times
    /// skipped by a DST jump are read with the offset in force before the
    /// jump, so they land past it: 02:30 on a 02:00 to 03:00 night is 03:30.
    #[must_use]
    pub fn localize(&self, naive: &NaiveDateTime) -> DateTime<FixedOffset> {
        fn resolve<Z: TimeZone>(zone: &Z, naive: &NaiveDateTime) -> DateTime<FixedOffset> {
            if let Some(dt) = zone.from_local_datetime(naive).earliest() {
                return dt.fixed_offset();
            }

            let before = zone
                .offset_from_utc_datetime(&(*naive - TimeDelta::days(1)))
                .fix();
            let utc = *naive - TimeDelta::seconds(i64::from(before.local_minus_utc()));
            zone.from_utc_datetime(&utc).fixed_offset()
        }

        match self {
            Zone::Local => resolve(&Local, naive),
            Zone::Named(tz) => resolve(tz, naive),
            Zone::Fixed(offset) => resolve(offset, naive),
        }
    }

    /// Expresses the same instant in this zone.
    #[must_use]
    pub fn convert(&self, instant: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            Zone::Local => instant.with_timezone(&Local).fixed_offset(),
            Zone::Named(tz) => instant.with_timezone(tz).fixed_offset(),
            Zone::Fixed(offset) => instant.with_timezone(offset),
        }
    }

    /// Zone identifier (`e`).
    fn identifier(&self, instant: &DateTime<FixedOffset>) -> String {
        match self {
            Zone::Named(tz) => tz.name().to_string(),
            Zone::Local | Zone::Fixed(_) => instant.format("%:z").to_string(),
        }
    }

    /// Zone abbreviation (`T`), falling back to the offset when the zone has none.
    fn abbreviation(&self, instant: &DateTime<FixedOffset>) -> String {
        match self {
            Zone::Named(tz) => instant.with_timezone(tz).format("%Z").to_string(),
            Zone::Local | Zone::Fixed(_) => instant.format("%:z").to_string(),
        }
    }

    /// Whether daylight saving time is in effect (`I`).
    fn is_dst(&self, instant: &DateTime<FixedOffset>) -> bool {
        match self {
            Zone::Named(tz) => !instant
                .with_timezone(tz)
                .offset()
                .dst_offset()
                .is_zero(),
            Zone::Local | Zone::Fixed(_) => false,
        }
    }
}

/// How the event time is rendered into [`Timestamp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFormat {
    /// Milliseconds since the Unix epoch.
    EpochMillis,
    /// Seconds since the Unix epoch.
    EpochSeconds,
    /// A chrono strftime pattern (anything containing `%`).
    Strftime(String),
    /// A PHP `date()` pattern.
    Php(String),
}

impl DateFormat {
    /// Resolves a format name or pattern.
    #[must_use]
    pub fn parse(format: &str) -> Self {
        match format {
            "epoch" => return DateFormat::EpochMillis,
            "timestamp" => return DateFormat::EpochSeconds,
            _ => {}
        }
        if let Some(pattern) = named_pattern(format) {
            return DateFormat::Php(pattern.to_string());
        }
        if format.contains('%') && is_valid_strftime(format) {
            return DateFormat::Strftime(format.to_string());
        }
        DateFormat::Php(format.to_string())
    }

    #[must_use]
    pub fn render(&self, instant: &DateTime<FixedOffset>, zone: &Zone) -> Timestamp {
        match self {
            DateFormat::EpochMillis => Timestamp::Epoch(instant.timestamp_millis()),
            DateFormat::EpochSeconds => Timestamp::Epoch(instant.timestamp()),
            DateFormat::Strftime(pattern) => {
                let mut out = String::new();
                // Validated in `parse`, writing to a String cannot fail otherwise.
                let _ = write!(out, "{}", instant.format(pattern));
                Timestamp::Text(out)
            }
            DateFormat::Php(pattern) => Timestamp::Text(php_date(pattern, instant, zone)),
        }
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        DateFormat::Php(ATOM.to_string())
    }
}

const ATOM: &str = "Y-m-d\\TH:i:sP";

fn named_pattern(name: &str) -> Option<&'static str> {
    let pattern = match name.to_ascii_uppercase().as_str() {
        "ATOM" | "RFC3339" | "W3C" => ATOM,
        "ISO8601" => "Y-m-d\\TH:i:sO",
        "RFC3339_EXTENDED" => "Y-m-d\\TH:i:s.vP",
        "RFC2822" | "RFC822" => "D, d M Y H:i:s O",
        "RFC7231" => "D, d M Y H:i:s \\G\\M\\T",
        "COOKIE" => "l, d-M-Y H:i:s T",
        _ => return None,
    };
    Some(pattern)
}

fn is_valid_strftime(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => next.signed_duration_since(first).num_days() as u32,
        _ => 31,
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Formats `instant` with PHP `date()` letters. Unknown letters are copied
/// verbatim and `\` escapes the following character.
fn php_date(pattern: &str, instant: &DateTime<FixedOffset>, zone: &Zone) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars();
    let hour12 = match instant.hour() % 12 {
        0 => 12,
        h => h,
    };

    while let Some(c) = chars.next() {
        // Writing into a String is infallible.
        let _ = match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
                Ok(())
            }
            'd' => write!(out, "{:02}", instant.day()),
            'D' => write!(out, "{}", instant.format("%a")),
            'j' => write!(out, "{}", instant.day()),
            'l' => write!(out, "{}", instant.format("%A")),
            'N' => write!(out, "{}", instant.weekday().number_from_monday()),
            'S' => write!(out, "{}", ordinal_suffix(instant.day())),
            'w' => write!(out, "{}", instant.weekday().num_days_from_sunday()),
            'z' => write!(out, "{}", instant.ordinal0()),
            'W' => write!(out, "{:02}", instant.iso_week().week()),
            'F' => write!(out, "{}", instant.format("%B")),
            'm' => write!(out, "{:02}", instant.month()),
            'M' => write!(out, "{}", instant.format("%b")),
            'n' => write!(out, "{}", instant.month()),
            't' => write!(out, "{}", days_in_month(instant.year(), instant.month())),
            'L' => write!(
                out,
                "{}",
                u8::from(NaiveDate::from_ymd_opt(instant.year(), 2, 29).is_some())
            ),
            'o' => write!(out, "{}", instant.iso_week().year()),
            'Y' => write!(out, "{:04}", instant.year()),
            'y' => write!(out, "{:02}", instant.year().rem_euclid(100)),
            'a' => write!(out, "{}", if instant.hour() < 12 { "am" } else { "pm" }),
            'A' => write!(out, "{}", if instant.hour() < 12 { "AM" } else { "PM" }),
            'g' => write!(out, "{hour12}"),
            'G' => write!(out, "{}", instant.hour()),
            'h' => write!(out, "{hour12:02}"),
            'H' => write!(out, "{:02}", instant.hour()),
            'i' => write!(out, "{:02}", instant.minute()),
            's' => write!(out, "{:02}", instant.second()),
            'u' => write!(out, "{:06}", instant.timestamp_subsec_micros()),
            'v' => write!(out, "{:03}", instant.timestamp_subsec_millis()),
            'e' => write!(out, "{}", zone.identifier(instant)),
            'I' => write!(out, "{}", u8::from(zone.is_dst(instant))),
            'O' => write!(out, "{}", instant.format("%z")),
            'P' => write!(out, "{}", instant.format("%:z")),
            'p' => {
                if instant.offset().local_minus_utc() == 0 {
                    write!(out, "Z")
                } else {
                    write!(out, "{}", instant.format("%:z"))
                }
            }
            'T' => write!(out, "{}", zone.abbreviation(instant)),
            'Z' => write!(out, "{}", instant.offset().local_minus_utc()),
            'U' => write!(out, "{}", instant.timestamp()),
            'c' => write!(out, "{}", php_date(ATOM, instant, zone)),
            'r' => write!(out, "{}", php_date("D, d M Y H:i:s O", instant, zone)),
            other => {
                out.push(other);
                Ok(())
            }
        };
    }
    out
}
