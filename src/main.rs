// main.rs

use anyhow::Context;
use clap::{CommandFactory, Parser};
use log::{debug, error};

use cosine_sim::config::{Cli, ConfigError};
use cosine_sim::cpu::SequentialEngine;
use cosine_sim::runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(err @ ConfigError::MissingVectorFile(_)) => {
            error!("{err}");
            Cli::command().print_help()?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    debug!("{config:?}");

    let parallel = runner::build_parallel_engine(config.backend, config.threads)
        .context("failed to initialise the parallel engine")?;

    let report = runner::run(&config, parallel.as_ref(), &SequentialEngine)?;
    debug!(
        "{}x{} matrix, equivalent: {}",
        report.rows,
        report.cols,
        report.is_equivalent()
    );

    Ok(())
}
