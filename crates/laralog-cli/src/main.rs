// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod args;

use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use laralog::constants::EXIT_FAILURE;
use laralog::logger;
use laralog::scheduler::Scheduler;

use crate::args::CliArgs;

#[tokio::main(flavor = "current_thread")]
pub async fn main() {
    let args = CliArgs::parse();

    logger::init();
    debug!("Logging subsystem enabled");

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            process::exit(EXIT_FAILURE);
        }
    };

    let scheduler = match Scheduler::from_config(&config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("{e}");
            process::exit(EXIT_FAILURE);
        }
    };

    let reason = scheduler.run(CancellationToken::new()).await;
    process::exit(reason.exit_code());
}
