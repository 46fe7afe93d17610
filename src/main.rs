mod cli;
mod concourse;
mod config;
mod error;
mod matrix;
mod output;
mod reducer;
mod server;
mod target;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting progress-board");
    cli.execute().await?;

    Ok(())
}
