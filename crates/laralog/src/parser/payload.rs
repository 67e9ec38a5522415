// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Isolation of JSON object payloads embedded in free-text log messages.
//!
//! Laravel appends its context array to the message as a JSON object, e.g.
//! `Example data {"foo": "Test", "bar": true}`. The scanner below finds such
//! objects without tokenizing JSON: it tracks brace depth and only keeps a
//! balanced span once a double quote has been seen, which filters out plain
//! `{placeholder}` text.
//!
//! A quote seen outside any brace arms the scanner, so the next balanced span
//! is captured even if it holds no quote itself. Messages such as
//! `user "bob" hit {limit}` therefore yield `{limit}` as a payload. Callers
//! decoding payloads must tolerate spans that are not valid JSON.

#[derive(Debug, Clone, Copy)]
enum ScanState {
    /// Between candidates. `armed` is set once a quote was seen at depth >= 0.
    Outside { armed: bool },
    /// Inside a brace span opened at byte `start` when depth was `base`.
    Inside {
        start: usize,
        base: i32,
        anchored: bool,
    },
}

/// Splits `message` into the text left once payload spans are removed and the
/// spans themselves, in the order they appear.
///
/// The remaining text is not trimmed.
#[must_use]
pub fn extract(message: &str) -> (String, Vec<String>) {
    let bytes = message.as_bytes();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut depth: i32 = 0;
    let mut state = ScanState::Outside { armed: false };

    // Braces and quotes are ASCII, so every index matched below sits on a char boundary.
    for (i, byte) in bytes.iter().enumerate() {
        state = match (state, byte) {
            (ScanState::Outside { armed }, b'{') => {
                let base = depth;
                depth += 1;
                ScanState::Inside {
                    start: i,
                    base,
                    anchored: armed,
                }
            }
            (ScanState::Outside { .. }, b'"') if depth >= 0 => ScanState::Outside { armed: true },
            (ScanState::Outside { armed }, b'}') => {
                depth -= 1;
                ScanState::Outside { armed }
            }
            (
                ScanState::Inside {
                    start,
                    base,
                    anchored,
                },
                b'{',
            ) => {
                depth += 1;
                ScanState::Inside {
                    start,
                    base,
                    anchored,
                }
            }
            (ScanState::Inside { start, base, .. }, b'"') if depth >= 0 => ScanState::Inside {
                start,
                base,
                anchored: true,
            },
            (
                ScanState::Inside {
                    start,
                    base,
                    anchored,
                },
                b'}',
            ) => {
                depth -= 1;
                if depth == base {
                    if anchored {
                        spans.push((start, i + 1));
                    }
                    ScanState::Outside { armed: false }
                } else {
                    ScanState::Inside {
                        start,
                        base,
                        anchored,
                    }
                }
            }
            (state, _) => state,
        };
    }

    if spans.is_empty() {
        return (message.to_string(), Vec::new());
    }

    let mut remaining = String::with_capacity(message.len());
    let mut extracted = Vec::with_capacity(spans.len());
    let mut cursor = 0;
    for (start, end) in spans {
        remaining.push_str(&message[cursor..start]);
        extracted.push(message[start..end].to_string());
        cursor = end;
    }
    remaining.push_str(&message[cursor..]);

    (remaining, extracted)
}
