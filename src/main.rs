//! Intermediary CLI entry point.

use clap::Parser;

use intermediary::cli::{commands, handle_error, Cli, Commands};
use intermediary::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => handle_error(&err, cli.json),
    };

    // Keep the guard alive so file logs are flushed on exit
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Config(args) => commands::config::execute(args, config, cli.json),
        Commands::Schedule(args) => commands::schedule::execute(args, &config, cli.json),
        Commands::Fetch(args) => commands::fetch::execute(args, config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}
