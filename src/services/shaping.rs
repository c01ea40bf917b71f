//! Reshapes raw stats frames into the warehouse fact-table layouts.
//!
//! Everything here is pure: frame in, frame out.

use chrono::NaiveDate;

use crate::error::ShapeError;
use crate::models::{Cell, Frame};
use crate::utils::{iso_date, parse_game_date};

pub const TEAM_GAMES_TABLE: &str = "fact_team_games";
pub const TEAM_GAMES_KEY: [&str; 2] = ["game_id", "team_id"];

pub const PLAYER_SEASON_STATS_TABLE: &str = "fact_player_season_stats";
pub const PLAYER_SEASON_STATS_KEY: [&str; 2] = ["player_id", "season"];

pub const TEAM_GAMES_RENAME: [(&str, &str); 17] = [
    ("SEASON_ID", "season_id"),
    ("TEAM_ID", "team_id"),
    ("GAME_ID", "game_id"),
    ("GAME_DATE", "game_date"),
    ("MATCHUP", "matchup"),
    ("WL", "wl"),
    ("PTS", "pts"),
    ("FG_PCT", "fg_pct"),
    ("FG3_PCT", "fg3_pct"),
    ("FT_PCT", "ft_pct"),
    ("REB", "reb"),
    ("AST", "ast"),
    ("STL", "stl"),
    ("BLK", "blk"),
    ("TOV", "tov"),
    ("PLUS_MINUS", "plus_minus"),
    ("DATE_TIME_PROCESSED", "date_time_processed"),
];

/// Column layout of `fact_team_games`.
pub const TEAM_GAMES_COLUMNS: [&str; 17] = [
    "game_id",
    "team_id",
    "game_date",
    "matchup",
    "wl",
    "pts",
    "plus_minus",
    "season_id",
    "fg_pct",
    "fg3_pct",
    "ft_pct",
    "reb",
    "ast",
    "stl",
    "blk",
    "tov",
    "date_time_processed",
];

pub const PLAYER_SEASON_STATS_RENAME: [(&str, &str); 69] = [
    ("PLAYER_ID", "player_id"),
    ("PLAYER_NAME", "player_name"),
    ("NICKNAME", "nickname"),
    ("TEAM_ID", "team_id"),
    ("TEAM_ABBREVIATION", "team_abbreviation"),
    ("AGE", "age"),
    ("GP", "gp"),
    ("W", "w"),
    ("L", "l"),
    ("W_PCT", "w_pct"),
    ("MIN", "min"),
    ("FGM", "fgm"),
    ("FGA", "fga"),
    ("FG_PCT", "fg_pct"),
    ("FG3M", "fg3m"),
    ("FG3A", "fg3a"),
    ("FG3_PCT", "fg3_pct"),
    ("FTM", "ftm"),
    ("FTA", "fta"),
    ("FT_PCT", "ft_pct"),
    ("OREB", "oreb"),
    ("DREB", "dreb"),
    ("REB", "reb"),
    ("AST", "ast"),
    ("TOV", "tov"),
    ("STL", "stl"),
    ("BLK", "blk"),
    ("BLKA", "blka"),
    ("PF", "pf"),
    ("PFD", "pfd"),
    ("PTS", "pts"),
    ("PLUS_MINUS", "plus_minus"),
    ("NBA_FANTASY_PTS", "nba_fantasy_pts"),
    ("DD2", "dd2"),
    ("TD3", "td3"),
    ("WNBA_FANTASY_PTS", "wnba_fantasy_pts"),
    ("GP_RANK", "gp_rank"),
    ("W_RANK", "w_rank"),
    ("L_RANK", "l_rank"),
    ("W_PCT_RANK", "w_pct_rank"),
    ("MIN_RANK", "min_rank"),
    ("FGM_RANK", "fgm_rank"),
    ("FGA_RANK", "fga_rank"),
    ("FG_PCT_RANK", "fg_pct_rank"),
    ("FG3M_RANK", "fg3m_rank"),
    ("FG3A_RANK", "fg3a_rank"),
    ("FG3_PCT_RANK", "fg3_pct_rank"),
    ("FTM_RANK", "ftm_rank"),
    ("FTA_RANK", "fta_rank"),
    ("FT_PCT_RANK", "ft_pct_rank"),
    ("OREB_RANK", "oreb_rank"),
    ("DREB_RANK", "dreb_rank"),
    ("REB_RANK", "reb_rank"),
    ("AST_RANK", "ast_rank"),
    ("TOV_RANK", "tov_rank"),
    ("STL_RANK", "stl_rank"),
    ("BLK_RANK", "blk_rank"),
    ("BLKA_RANK", "blka_rank"),
    ("PF_RANK", "pf_rank"),
    ("PFD_RANK", "pfd_rank"),
    ("PTS_RANK", "pts_rank"),
    ("PLUS_MINUS_RANK", "plus_minus_rank"),
    ("NBA_FANTASY_PTS_RANK", "nba_fantasy_pts_rank"),
    ("DD2_RANK", "dd2_rank"),
    ("TD3_RANK", "td3_rank"),
    ("WNBA_FANTASY_PTS_RANK", "wnba_fantasy_pts_rank"),
    ("TEAM_COUNT", "team_count"),
    ("SEASON", "season"),
    ("DATE_TIME_PROCESSED", "date_time_processed"),
];

/// Shape stacked game logs into `fact_team_games` rows.
///
/// Rows dated on or after `cutoff` are dropped, as are rows with no date.
/// Duplicate `(game_id, team_id)` pairs keep their first occurrence.
pub fn shape_team_games(raw: Frame, cutoff: NaiveDate) -> Result<Frame, ShapeError> {
    let raw_rows = raw.len();
    // normalized dates are ISO strings, which order the same as the dates
    let cutoff_iso = iso_date(cutoff);

    let frame = raw
        .rename(&TEAM_GAMES_RENAME)?
        .select(&TEAM_GAMES_COLUMNS)?
        .map_column("game_date", normalize_game_date)?
        .filter_by("game_date", |cell| match cell.as_str() {
            Some(date) => date < cutoff_iso.as_str(),
            None => false,
        })?
        .replace_nan_with_null()
        .drop_duplicates(&TEAM_GAMES_KEY)?;

    tracing::info!(
        "Shaped team games: {} raw rows -> {} rows (cutoff {})",
        raw_rows,
        frame.len(),
        cutoff
    );
    Ok(frame)
}

/// Rename player season stats to `fact_player_season_stats` columns.
pub fn shape_player_season_stats(raw: Frame) -> Result<Frame, ShapeError> {
    let frame = raw
        .rename(&PLAYER_SEASON_STATS_RENAME)?
        .replace_nan_with_null();

    let unmapped: Vec<&str> = frame
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| !PLAYER_SEASON_STATS_RENAME.iter().any(|(_, to)| to == c))
        .collect();
    if !unmapped.is_empty() {
        tracing::warn!("Player season stats carry unmapped columns: {:?}", unmapped);
    }

    Ok(frame)
}

/// Parse a raw game date into an ISO string. Missing dates become null.
fn normalize_game_date(cell: &Cell) -> Result<Cell, ShapeError> {
    match cell {
        Cell::Text(raw) => parse_game_date(raw)
            .map(|d| Cell::Text(iso_date(d)))
            .ok_or_else(|| ShapeError::InvalidDate(raw.clone())),
        Cell::Null => Ok(Cell::Null),
        Cell::Float(f) if f.is_nan() => Ok(Cell::Null),
        other => Err(ShapeError::InvalidDate(other.to_string())),
    }
}
