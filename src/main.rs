mod cli;
mod commands;
mod layout;
mod page_range;
mod pdf;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = cli.options()?;

    commands::two_up::run(&cli.input, &cli.output, &options)?;

    Ok(())
}
