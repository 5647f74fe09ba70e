mod cli;
mod collector;
mod config;
mod db;
mod error;
mod fetcher;
mod goals;
mod scorer;
mod types;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::{Config, Credentials};
use crate::error::Result;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    // Only `collect` and `verify` need these; the rest run without them.
    let creds = Credentials::from_env();

    if let Err(e) = run(cli.command.unwrap_or(Commands::Collect), &cfg, creds).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, cfg: &Config, creds: Result<Credentials>) -> Result<()> {
    match command {
        Commands::Collect => cli::run_collect(cfg, &creds?).await.map(|_| ()),
        Commands::Setup => cli::run_setup(cfg).await,
        Commands::Verify => cli::run_verify(cfg, &creds?).await,
        Commands::Goal { command } => cli::run_goal(cfg, command).await,
    }
}
