use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use forest_sweep::{pipeline, SweepConfig};

/// Monte-Carlo analysis of random forest accuracy over depth, label noise, PCA and multiplicity
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// JSON file describing the datasets and the swept ranges
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if !cli.config.is_file() {
        eprintln!("configuration file {} not found", cli.config.display());
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = SweepConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let report = pipeline::run(&config).context("analysis failed")?;

    info!(
        "analysed {} datasets and {} multiplicity comparisons into {}",
        report.datasets.len(),
        report.multiplicity.len(),
        config.output_dir.display()
    );

    Ok(())
}
