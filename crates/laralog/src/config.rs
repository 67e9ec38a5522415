// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono_tz::Tz;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::client::ClientConfig;
use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_INDEX, DEFAULT_READ_FREQ_MS, DEFAULT_RETRIES,
};
use crate::destination::{SenderKind, Sink};
use crate::error::ConfigError;
use crate::parser::timestamp::{DateFormat, Zone};
use crate::parser::ParserConfig;
use crate::source::Input;

/// Everything the forwarder needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Destination hosts, tried in order or round robin depending on the sender
    pub hosts: Vec<String>,
    /// Index or service name events are queued under
    pub index: String,
    /// Levels that are never forwarded
    pub ignore_levels: Vec<String>,
    /// Echo every forwarded event
    pub verbose: bool,
    /// Deliver batches in the background
    pub async_dispatch: bool,
    pub input: Input,
    pub batch_size: usize,
    pub verify_certificates: bool,
    /// Zone the log timestamps were written in
    pub from_timezone: Zone,
    /// Zone timestamps are rendered in
    pub to_timezone: Option<Zone>,
    pub retries: u32,
    /// Scheduler period
    pub read_freq: Duration,
    pub hostname: String,
    pub sender: SenderKind,
    /// Decode payloads into `parameters`
    pub smart: bool,
    /// Overrides the sender's timestamp format
    pub date_format: Option<String>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost:9200".to_string()],
            index: DEFAULT_INDEX.to_string(),
            ignore_levels: Vec::new(),
            verbose: false,
            async_dispatch: false,
            input: Input::Stdin,
            batch_size: DEFAULT_BATCH_SIZE,
            verify_certificates: true,
            from_timezone: Zone::Local,
            to_timezone: None,
            retries: DEFAULT_RETRIES,
            read_freq: Duration::from_millis(DEFAULT_READ_FREQ_MS),
            hostname: "unknown".to_string(),
            sender: SenderKind::ElasticSearch,
            smart: false,
            date_format: None,
        }
    }
}

impl ForwarderConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.iter().all(|host| host.trim().is_empty()) {
            return Err(ConfigError::Invalid("no host configured".to_string()));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch size must be greater than 0".to_string(),
            ));
        }

        if self.read_freq.is_zero() {
            return Err(ConfigError::Invalid(
                "read frequency must be greater than 0".to_string(),
            ));
        }

        if self.index.trim().is_empty() {
            return Err(ConfigError::Invalid("index cannot be empty".to_string()));
        }

        Ok(())
    }

    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            hosts: self.hosts.clone(),
            retries: self.retries,
            verify_certificates: self.verify_certificates,
            batch_size: self.batch_size,
            async_dispatch: self.async_dispatch,
        }
    }

    /// Parser settings for `sink`: its timestamp format unless overridden, and
    /// UTC when it requires it.
    #[must_use]
    pub fn parser_config(&self, sink: &dyn Sink) -> ParserConfig {
        let format = self.date_format.as_deref().unwrap_or(sink.date_format());
        let target_zone = if sink.force_utc() {
            Some(Zone::Named(Tz::UTC))
        } else {
            self.to_timezone
        };

        ParserConfig {
            source_zone: self.from_timezone,
            target_zone,
            date_format: DateFormat::parse(format),
            smart: self.smart,
        }
    }
}

/// Splits a comma separated level list, dropping blanks.
#[must_use]
pub fn parse_levels(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads hosts from `value` when it names a file (one per line), otherwise
/// treats `value` as the only host.
pub fn load_hosts(value: &str) -> Result<Vec<String>, ConfigError> {
    let path = Path::new(value);
    if !path.is_file() {
        return Ok(vec![value.trim().to_string()]);
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::HostsFile {
        path: path.to_path_buf(),
        source,
    })?;
    let hosts: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if hosts.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "hosts file {} is empty",
            path.display()
        )));
    }
    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ForwarderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let config = ForwarderConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_zero_read_freq() {
        let config = ForwarderConfig {
            read_freq: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_hosts() {
        let config = ForwarderConfig {
            hosts: vec![" ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ForwarderConfig {
            hosts: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!(parse_levels("DEBUG, INFO,,"), vec!["DEBUG", "INFO"]);
        assert!(parse_levels("").is_empty());
    }

    #[test]
    fn test_load_single_host() {
        assert_eq!(
            load_hosts("http://localhost:9200").unwrap(),
            vec!["http://localhost:9200"]
        );
    }

    #[test]
    fn test_load_hosts_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "http://es-1:9200").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  http://es-2:9200  ").unwrap();
        file.flush().unwrap();

        let hosts = load_hosts(file.path().to_str().unwrap()).unwrap();
        assert_eq!(hosts, vec!["http://es-1:9200", "http://es-2:9200"]);
    }

    #[test]
    fn test_load_empty_hosts_file() {
        let file = NamedTempFile::new().unwrap();
        assert!(load_hosts(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_parser_config_follows_sender() {
        let config = ForwarderConfig {
            to_timezone: Some("Europe/Madrid".parse().unwrap()),
            smart: true,
            ..Default::default()
        };
        let client = Client::new(config.client_config()).unwrap();

        let sink = SenderKind::Datadog.build(client.clone());
        let parser = config.parser_config(sink.as_ref());
        assert_eq!(parser.date_format, DateFormat::EpochMillis);
        assert_eq!(parser.target_zone, Some(Zone::Named(Tz::UTC)));
        assert!(parser.smart);

        let sink = SenderKind::ElasticSearch.build(client);
        let parser = config.parser_config(sink.as_ref());
        assert_eq!(parser.date_format, DateFormat::Php("Y-m-d\\TH:i:sP".to_string()));
        assert_eq!(parser.target_zone, config.to_timezone);
    }

    #[test]
    fn test_date_format_override() {
        let config = ForwarderConfig {
            date_format: Some("timestamp".to_string()),
            ..Default::default()
        };
        let sink = SenderKind::Stdout.build(Client::new(config.client_config()).unwrap());
        assert_eq!(
            config.parser_config(sink.as_ref()).date_format,
            DateFormat::EpochSeconds
        );
    }
}
