use anyhow::{Context, Result};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::db::{connect, upsert_in_chunks, RecordStore, UpsertReport};
use crate::models::Cell;
use crate::services::{
    fetch_teams, shape_player_season_stats, shape_team_games, team_lookup, DataFetcher,
    PLAYER_SEASON_STATS_KEY, PLAYER_SEASON_STATS_TABLE, TEAM_GAMES_KEY, TEAM_GAMES_TABLE,
};

/// Full run: team games first, then player season stats.
pub async fn run_etl(config: &Config) -> Result<()> {
    let fetcher = DataFetcher::new(&config.stats_base_url)?;
    let store = connect(config)?;

    println!("🏀 Starting NBA ETL...");

    let games = team_games_pipeline(config, &fetcher, &store).await?;
    let stats = player_season_stats_pipeline(config, &fetcher, &store).await?;

    for report in [&games, &stats] {
        if report.has_failures() {
            tracing::error!(
                "{}: {} of {} batches failed: {:?}",
                report.table,
                report.failed_batches.len(),
                report.batches,
                report.failed_batches
            );
        }
    }

    println!("✅ ETL process completed successfully.");
    Ok(())
}

pub async fn run_team_games(config: &Config) -> Result<()> {
    let fetcher = DataFetcher::new(&config.stats_base_url)?;
    let store = connect(config)?;
    team_games_pipeline(config, &fetcher, &store).await?;
    Ok(())
}

pub async fn run_player_season_stats(config: &Config) -> Result<()> {
    let fetcher = DataFetcher::new(&config.stats_base_url)?;
    let store = connect(config)?;
    player_season_stats_pipeline(config, &fetcher, &store).await?;
    Ok(())
}

async fn team_games_pipeline<S: RecordStore>(
    config: &Config,
    fetcher: &DataFetcher,
    store: &S,
) -> Result<UpsertReport> {
    println!("📥 Fetching teams...");
    let teams = fetch_teams();

    println!("📥 Fetching game logs for {} teams...", teams.len());
    let raw = fetcher.fetch_team_games(&teams).await?;

    println!("🔧 Shaping team games (cutoff {})...", config.game_date_cutoff);
    let shaped = shape_team_games(raw, config.game_date_cutoff)
        .context("Failed to shape team games")?;

    if shaped.is_empty() {
        tracing::warn!("No team games left after shaping");
    }

    // per-team row counts, named through the team lookup
    let lookup = team_lookup(&teams);
    let team_idx = shaped.column_index("team_id")?;
    let mut per_team: BTreeMap<String, usize> = BTreeMap::new();
    for row in shaped.rows() {
        let name = match &row[team_idx] {
            Cell::Int(id) => lookup
                .get(id)
                .map_or_else(|| id.to_string(), |t| t.abbreviation.clone()),
            other => other.to_string(),
        };
        *per_team.entry(name).or_default() += 1;
    }
    for (team, count) in &per_team {
        tracing::debug!("{}: {} games to load", team, count);
    }

    let records = shaped.to_records();
    println!("📤 Upserting {} rows into {}...", records.len(), TEAM_GAMES_TABLE);
    let report = upsert_in_chunks(store, TEAM_GAMES_TABLE, &TEAM_GAMES_KEY, &records, config.chunk_size).await?;

    println!("{}", report);
    Ok(report)
}

async fn player_season_stats_pipeline<S: RecordStore>(
    config: &Config,
    fetcher: &DataFetcher,
    store: &S,
) -> Result<UpsertReport> {
    println!("📥 Fetching player season stats for {}...", config.seasons.join(", "));
    let raw = fetcher.fetch_player_season_stats(&config.seasons).await?;

    println!("🔧 Shaping player season stats...");
    let shaped = shape_player_season_stats(raw).context("Failed to shape player season stats")?;

    let records = shaped.to_records();
    println!("📤 Upserting {} rows into {}...", records.len(), PLAYER_SEASON_STATS_TABLE);
    let report = upsert_in_chunks(
        store,
        PLAYER_SEASON_STATS_TABLE,
        &PLAYER_SEASON_STATS_KEY,
        &records,
        config.chunk_size,
    )
    .await?;

    println!("{}", report);
    Ok(report)
}

pub fn show_teams() -> Result<()> {
    let teams = fetch_teams();

    println!("🏀 NBA teams ({}):\n", teams.len());
    for team in &teams {
        println!(
            "   • {} ({}) - {}, {} - since {} [id {}]",
            team.full_name, team.abbreviation, team.city, team.state, team.year_founded, team.team_id
        );
    }

    Ok(())
}

pub async fn show_players(stats_base_url: &str, season: &str) -> Result<()> {
    let fetcher = DataFetcher::new(stats_base_url)?;

    println!("🔍 Fetching players through {}...", season);
    let players = fetcher.fetch_players(season).await?;

    let active = players.iter().filter(|p| p.is_active).count();
    println!("📊 {} players on record, {} active", players.len(), active);

    println!("\n💡 Active sample:");
    for player in players.iter().filter(|p| p.is_active).take(10) {
        println!("   • {} [id {}]", player.full_name, player.player_id);
    }

    Ok(())
}
