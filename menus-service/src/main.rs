use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub mod app;

#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed an empty store, then serve the menus API until interrupted.
    Serve,
    /// Seed an empty store and exit.
    Seed,
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Serve => app::serve::main().await,
        Commands::Seed => app::seed::main().await,
    }
}
