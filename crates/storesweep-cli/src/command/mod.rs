use clap::{Parser, Subcommand};

use self::{baseline::BaselineArg, inspect::InspectArg, run::RunArg};

mod baseline;
mod inspect;
mod run;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What to do (defaults to `run`)
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Sweep reward weights for each algorithm and archive the evaluations
    Run(#[clap(flatten)] RunArg),
    /// Summarize a result archive as JSON
    Inspect(#[clap(flatten)] InspectArg),
    /// Evaluate the fixed rotating baseline policy under equal weights
    Baseline(#[clap(flatten)] BaselineArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode.unwrap_or(Mode::Run(RunArg::default())) {
        Mode::Run(arg) => run::run(&arg)?,
        Mode::Inspect(arg) => inspect::run(&arg)?,
        Mode::Baseline(arg) => baseline::run(&arg)?,
    }
    Ok(())
}
