mod cli;
mod client;
mod collector;
mod error;
mod format;
mod models;
mod repository;
mod settings;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting QuaLens - Code Quality Collection Tool");
    cli.execute().await?;

    Ok(())
}
