//! jobdeck: terminal dashboard for the batch scraping server.

mod cli;
mod platform;

use anyhow::Result;
use clap::Parser;
use deck_logging::deck_info;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut settings, source) = platform::settings::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        settings.base_url = server;
    }
    platform::logging::initialize(settings.log_destination);
    match source {
        Some(path) => deck_info!("Loaded settings from {:?}", path),
        None => deck_info!("No settings file; using defaults"),
    }
    platform::run_app(settings, cli.command)
}
