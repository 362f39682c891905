// src/main.rs — siterelay entry point

use clap::Parser;

use siterelay::cli::{serve, Cli, Commands};
use siterelay::infra::config::Config;
use siterelay::infra::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let mut config = match cli.config {
        Some(ref path) => {
            let mut c = Config::load_from(path)?;
            c.apply_env();
            c
        }
        None => Config::load()?,
    };
    cli.apply_overrides(&mut config);

    // Respects RUST_LOG / SITERELAY_LOG before the configured level
    logger::init_logging(&config.log.level);

    match cli.command {
        Some(Commands::Plugins) => serve::run_list(&config).await,
        Some(Commands::Serve) | None => serve::run_serve(&config).await,
    }
}
