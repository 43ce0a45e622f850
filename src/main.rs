use anyhow::{Context, Result};
use clap::Parser;

use tsbuild::cli::build::run_build;
use tsbuild::cli::output::format_report;
use tsbuild::cli::Cli;
use tsbuild::service::esbuild::EsbuildCommand;
use tsbuild::service::tsc::TscCommand;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("failed to determine the working directory")?;

    let bundler = EsbuildCommand::new(&cli.esbuild);
    let emitter = TscCommand::new(&cli.tsc);
    let report = run_build(&cli, &cwd, &bundler, &emitter)?;

    for warning in &report.warnings {
        eprintln!("{}", warning);
    }
    println!("{}", format_report(&report, &cli));

    Ok(())
}
