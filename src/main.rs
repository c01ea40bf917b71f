mod cli;
mod config;
mod db;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "ballknower")]
#[command(about = "Loads NBA team game logs and player season stats into the warehouse")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ETL: team games, then player season stats
    Run,
    /// Load only the team games fact table
    TeamGames,
    /// Load only the player season stats fact table
    PlayerStats,
    /// List the NBA teams the ETL walks
    Teams,
    /// Summarize the player list from the stats API
    Players {
        #[arg(short, long, default_value = "2024-25")]
        season: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run) | None => {
            tracing::info!("Running NBA ETL");
            cli::run_etl(&Config::from_env()?).await?;
        }
        Some(Commands::TeamGames) => {
            tracing::info!("Loading team games");
            cli::run_team_games(&Config::from_env()?).await?;
        }
        Some(Commands::PlayerStats) => {
            tracing::info!("Loading player season stats");
            cli::run_player_season_stats(&Config::from_env()?).await?;
        }
        Some(Commands::Teams) => {
            cli::show_teams()?;
        }
        Some(Commands::Players { season }) => {
            tracing::info!("Querying players through {}", season);
            cli::show_players(&config::stats_base_url_from_env(), &season).await?;
        }
    }

    Ok(())
}
