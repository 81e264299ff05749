mod analysis;
mod config;
mod engine;
mod manager;
mod model;
mod presenter;

use crate::config::Overrides;
use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run {
        #[arg(long)]
        r0: Option<f64>,

        #[arg(long)]
        incubation_days: Option<f64>,

        #[arg(long)]
        horizon_days: Option<u64>,
    },

    Sweep {
        #[arg(long, value_delimiter = ',', required = true)]
        r0_values: Vec<f64>,
    },

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Run {
            r0,
            incubation_days,
            horizon_days,
        } => {
            let overrides = Overrides {
                r0,
                incubation_period_days: incubation_days,
                horizon_days,
            };
            mgr.run_simulation(&overrides)?
        }
        Command::Sweep { r0_values } => mgr.run_sweep(&r0_values)?,
        Command::Clean => mgr.clean_sim()?,
    }

    Ok(())
}
