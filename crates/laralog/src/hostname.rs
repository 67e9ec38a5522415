// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hostname attached to every forwarded event.
//!
//! Resolution order:
//! 1. `LARALOG_HOSTNAME` environment variable
//! 2. `HOSTNAME` environment variable
//! 3. system hostname
//! 4. `unknown`

use std::env;
use tracing::warn;

#[must_use]
pub fn get_hostname() -> String {
    for var in ["LARALOG_HOSTNAME", "HOSTNAME"] {
        if let Ok(hostname) = env::var(var) {
            if !hostname.trim().is_empty() {
                return hostname.trim().to_string();
            }
        }
    }

    if let Some(hostname) = system_hostname() {
        return hostname;
    }

    warn!("Could not determine hostname, using 'unknown'");
    "unknown".to_string()
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(hostname) => hostname
            .to_str()
            .filter(|hostname| !hostname.is_empty())
            .map(str::to_string),
        Err(e) => {
            warn!("Failed to get system hostname: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    env::var("COMPUTERNAME").ok().filter(|name| !name.is_empty())
}
