// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Producers of raw log lines.

pub mod stdin;
pub mod stream;

use std::path::PathBuf;

use crate::constants::STDIN_MARKER;
use crate::error::ConfigError;

/// Pull-based line producer polled by the scheduler on every tick.
pub trait LogReader: Send {
    /// Returns the complete lines that became available since the previous call.
    fn read_lines(&mut self) -> Vec<String>;

    /// Whether no line will ever be produced again.
    fn is_exhausted(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    /// `None`, `-` and `php://stdin` select standard input, anything else is a path.
    #[must_use]
    pub fn from_arg(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("" | "-" | STDIN_MARKER) => Input::Stdin,
            Some(path) => Input::File(PathBuf::from(path)),
        }
    }

    pub fn open(&self) -> Result<Box<dyn LogReader>, ConfigError> {
        match self {
            Input::Stdin => {
                let reader = stdin::StdinReader::spawn().map_err(|e| {
                    ConfigError::Invalid(format!("unable to read standard input: {e}"))
                })?;
                Ok(Box::new(reader))
            }
            Input::File(path) => Ok(Box::new(stream::StreamReader::new(path))),
        }
    }
}
