// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tracing::debug;

use super::LogReader;

/// Lines read from standard input by a background thread.
///
/// Blocking reads never stall the poll loop; each call drains whatever the
/// thread has received so far.
#[derive(Debug)]
pub struct StdinReader {
    receiver: UnboundedReceiver<String>,
    closed: bool,
}

impl StdinReader {
    pub fn spawn() -> io::Result<Self> {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name("laralog-stdin".to_string())
            .spawn(move || {
                let mut reader = reader;
                let mut buffer = Vec::new();
                loop {
                    buffer.clear();
                    match reader.read_until(b'\n', &mut buffer) {
                        Ok(0) => break,
                        Ok(_) => {
                            let line = String::from_utf8_lossy(&buffer);
                            let line = line.trim_end_matches(['\r', '\n']);
                            if line.is_empty() {
                                continue;
                            }
                            if sender.send(line.to_string()).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(e) => {
                            debug!("Stopped reading standard input: {}", e);
                            break;
                        }
                    }
                }
            })?;

        Ok(StdinReader {
            receiver,
            closed: false,
        })
    }
}

impl LogReader for StdinReader {
    fn read_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(line) => lines.push(line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        lines
    }

    fn is_exhausted(&self) -> bool {
        self.closed
    }
}
