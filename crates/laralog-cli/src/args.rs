// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use std::time::Duration;

use laralog::config::{load_hosts, parse_levels, ForwarderConfig};
use laralog::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_INDEX, DEFAULT_READ_FREQ_MS, DEFAULT_RETRIES, DEFAULT_SENDER,
    STDIN_MARKER,
};
use laralog::destination::SenderKind;
use laralog::error::ConfigError;
use laralog::hostname::get_hostname;
use laralog::parser::timestamp::Zone;
use laralog::source::Input;

#[derive(Parser, Debug, Clone)]
#[command(name = "laralog")]
#[command(version, about = "Tail a Laravel log and forward its events", long_about = None)]
pub struct CliArgs {
    /// Destination host, or a file listing one host per line
    pub host: String,

    #[arg(long, default_value = DEFAULT_INDEX, help = "Index or service name")]
    pub index: String,

    #[arg(long, help = "Comma separated levels to ignore, e.g. DEBUG,INFO")]
    pub ignore: Option<String>,

    #[arg(short, long, help = "Print every forwarded event")]
    pub verbose: bool,

    #[arg(long = "async", help = "Send batches in the background")]
    pub async_dispatch: bool,

    #[arg(short, long, default_value = STDIN_MARKER, help = "Log file to tail, '-' for standard input")]
    pub input: String,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, help = "Events per request")]
    pub batch_size: usize,

    #[arg(long, help = "Skip TLS certificate verification")]
    pub no_check_cert: bool,

    #[arg(long, help = "Time zone the log was written in (default: local)")]
    pub from_timezone: Option<String>,

    #[arg(long, help = "Time zone to render timestamps in")]
    pub to_timezone: Option<String>,

    #[arg(long, default_value_t = DEFAULT_RETRIES, help = "Retries on failed requests")]
    pub retries: u32,

    #[arg(long, default_value_t = DEFAULT_READ_FREQ_MS, help = "Read frequency in milliseconds")]
    pub read_freq: u64,

    #[arg(long, help = "Override the hostname attached to events")]
    pub hostname: Option<String>,

    #[arg(long, default_value = DEFAULT_SENDER, help = "Sender driver: elastic_search, datadog or stdout")]
    pub sender: String,

    #[arg(long, help = "Decode JSON payloads into a parameters field")]
    pub smart: bool,

    #[arg(long, help = "Timestamp format: epoch, timestamp, a named format or a pattern")]
    pub date_format: Option<String>,
}

impl CliArgs {
    pub fn into_config(self) -> Result<ForwarderConfig, ConfigError> {
        let from_timezone = match self.from_timezone.as_deref() {
            Some(zone) => zone.parse::<Zone>()?,
            None => Default::default(),
        };
        let to_timezone = self
            .to_timezone
            .as_deref()
            .map(str::parse::<Zone>)
            .transpose()?;

        let config = ForwarderConfig {
            hosts: load_hosts(&self.host)?,
            index: self.index,
            ignore_levels: self.ignore.as_deref().map(parse_levels).unwrap_or_default(),
            verbose: self.verbose,
            async_dispatch: self.async_dispatch,
            input: Input::from_arg(Some(&self.input)),
            batch_size: self.batch_size,
            verify_certificates: !self.no_check_cert,
            from_timezone,
            to_timezone,
            retries: self.retries,
            read_freq: Duration::from_millis(self.read_freq),
            hostname: self.hostname.unwrap_or_else(get_hostname),
            sender: self.sender.parse::<SenderKind>()?,
            smart: self.smart,
            date_format: self.date_format,
        };

        config.validate()?;
        Ok(config)
    }
}
