use std::str::FromStr;

use clap::Parser;
use log::{error, LevelFilter};

use srvadm::cli::Cli;
use srvadm::config::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // init logger
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::from_str(&cli.log_level).unwrap_or(LevelFilter::Warn))
        .init();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            eprintln!("Fatal error: failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = cli.execute(&config).await {
        error!("Aborting: {:#}", e);
        eprintln!("Fatal error: {:#}", e);
        eprintln!("Aborting.");
        std::process::exit(1);
    }
}
