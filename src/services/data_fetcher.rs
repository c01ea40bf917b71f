use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{Cell, Frame, Player, StatsResponse, Team};
use crate::services::static_teams::NBA_TEAMS;
use crate::utils::{processed_now, split_last_comma_first};

// stats.nba.com drops requests that don't look like they came from a browser
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Columns forced to text after the season frames are stacked.
const PLAYER_TEXT_COLUMNS: [&str; 3] = ["PLAYER_NAME", "NICKNAME", "TEAM_ABBREVIATION"];

// ── DataFetcher ──────────────────────────────────────────────────────────────

pub struct DataFetcher {
    client: Client,
    base_url: String,
}

impl DataFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET a stats endpoint and return its first result set as a frame.
    async fn fetch_result_set(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Frame> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self.client.get(&url).query(params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} API error {}: {}", endpoint, status, body));
        }

        let data: StatsResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", endpoint))?;

        let first = data
            .result_sets
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{} returned no result sets", endpoint))?;

        tracing::debug!("{}: result set '{}' with {} rows", endpoint, first.name, first.row_set.len());
        Ok(first.into_frame()?)
    }

    // ── Teams / players ──────────────────────────────────────────────────────

    /// Every player the league has on record, active or not.
    pub async fn fetch_players(&self, season: &str) -> Result<Vec<Player>> {
        tracing::info!("Fetching players (through {})…", season);

        let frame = self
            .fetch_result_set(
                "commonallplayers",
                &[
                    ("LeagueID", "00".to_string()),
                    ("Season", season.to_string()),
                    ("IsOnlyCurrentSeason", "0".to_string()),
                ],
            )
            .await?;

        let id_idx = frame.column_index("PERSON_ID")?;
        let full_idx = frame.column_index("DISPLAY_FIRST_LAST")?;
        let lcf_idx = frame.column_index("DISPLAY_LAST_COMMA_FIRST")?;
        let status_idx = frame.column_index("ROSTERSTATUS")?;

        let processed = processed_now();
        let players = frame
            .rows()
            .iter()
            .filter_map(|row| {
                let Some(player_id) = row[id_idx].as_i64() else {
                    tracing::warn!("Skipping player row without numeric PERSON_ID: {:?}", row[id_idx]);
                    return None;
                };
                let (first_name, last_name) = split_last_comma_first(&row[lcf_idx].to_string());
                Some(Player {
                    player_id,
                    full_name: row[full_idx].to_string(),
                    first_name,
                    last_name,
                    is_active: row[status_idx].as_i64() == Some(1),
                    date_time_processed: processed.clone(),
                })
            })
            .collect::<Vec<_>>();

        tracing::info!("Fetched {} players", players.len());
        Ok(players)
    }

    // ── Team games ───────────────────────────────────────────────────────────

    /// One game-log call per team, stacked in team order.
    pub async fn fetch_team_games(&self, teams: &[Team]) -> Result<Frame> {
        let mut team_games = Vec::with_capacity(teams.len());

        for team in teams {
            tracing::info!("Fetching game log for {} ({})…", team.full_name, team.team_id);

            let games = self
                .fetch_result_set(
                    "leaguegamefinder",
                    &[
                        ("PlayerOrTeam", "T".to_string()),
                        ("TeamID", team.team_id.to_string()),
                        ("LeagueID", String::new()),
                    ],
                )
                .await?
                .with_constant("DATE_TIME_PROCESSED", Cell::Text(processed_now()));

            tracing::info!("{}: {} games", team.abbreviation, games.len());
            team_games.push(games);
        }

        let combined = Frame::concat(team_games);
        tracing::info!("Fetched {} team game rows across {} teams", combined.len(), teams.len());
        Ok(combined)
    }

    // ── Player season stats ─────────────────────────────────────────────────

    /// Regular-season per-game base stats, one call per season, stacked.
    pub async fn fetch_player_season_stats(&self, seasons: &[String]) -> Result<Frame> {
        if seasons.is_empty() {
            tracing::warn!("No seasons configured — skipping player season stats");
            return Ok(Frame::default());
        }

        let mut season_frames = Vec::with_capacity(seasons.len());

        for season in seasons {
            tracing::info!("Processing season: {}", season);

            let frame = self
                .fetch_result_set("leaguedashplayerstats", &player_stats_params(season))
                .await?;

            tracing::info!("Season {} data shape: ({}, {})", season, frame.len(), frame.width());

            let frame = frame
                .with_constant("SEASON", Cell::Text(season.clone()))
                .with_constant("DATE_TIME_PROCESSED", Cell::Text(processed_now()));
            season_frames.push(frame);
        }

        let mut compiled = Frame::concat(season_frames);
        for col in PLAYER_TEXT_COLUMNS {
            compiled = compiled.map_column(col, |cell| {
                Ok(match cell {
                    Cell::Int(_) | Cell::Float(_) if !cell.is_nan() => Cell::Text(cell.to_string()),
                    Cell::Float(_) => Cell::Null,
                    other => other.clone(),
                })
            })?;
        }

        Ok(compiled)
    }
}

/// The static team list, sorted by full name and stamped with the current time.
pub fn fetch_teams() -> Vec<Team> {
    let processed = processed_now();
    let mut teams: Vec<Team> = NBA_TEAMS
        .iter()
        .map(|&(team_id, full_name, abbreviation, nickname, city, state, year_founded)| Team {
            team_id,
            full_name: full_name.to_string(),
            abbreviation: abbreviation.to_string(),
            nickname: nickname.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            year_founded,
            date_time_processed: processed.clone(),
        })
        .collect();

    teams.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    teams
}

pub fn team_lookup(teams: &[Team]) -> HashMap<i64, Team> {
    teams.iter().map(|t| (t.team_id, t.clone())).collect()
}

/// Query for `leaguedashplayerstats`; the endpoint rejects requests missing
/// any of these, even when blank.
fn player_stats_params(season: &str) -> Vec<(&'static str, String)> {
    let fixed: &[(&str, &str)] = &[
        ("College", ""),
        ("Conference", ""),
        ("Country", ""),
        ("DateFrom", ""),
        ("DateTo", ""),
        ("Division", ""),
        ("DraftPick", ""),
        ("DraftYear", ""),
        ("GameScope", ""),
        ("GameSegment", ""),
        ("Height", ""),
        ("LastNGames", "0"),
        ("LeagueID", "00"),
        ("Location", ""),
        ("MeasureType", "Base"),
        ("Month", "0"),
        ("OpponentTeamID", "0"),
        ("Outcome", ""),
        ("PORound", "0"),
        ("PaceAdjust", "N"),
        ("PerMode", "PerGame"),
        ("Period", "0"),
        ("PlayerExperience", ""),
        ("PlayerPosition", ""),
        ("PlusMinus", "N"),
        ("Rank", "N"),
        ("SeasonSegment", ""),
        ("SeasonType", "Regular Season"),
        ("ShotClockRange", ""),
        ("StarterBench", ""),
        ("TeamID", "0"),
        ("TwoWay", "0"),
        ("VsConference", ""),
        ("VsDivision", ""),
        ("Weight", ""),
        ("ISTRound", ""),
    ];

    let mut params: Vec<(&'static str, String)> =
        fixed.iter().map(|(k, v)| (*k, v.to_string())).collect();
    params.push(("Season", season.to_string()));
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn game_log(team_id: i64, game_ids: &[&str]) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = game_ids
            .iter()
            .map(|g| json!(["22024", team_id, g, "2024-11-01", "AAA vs. BBB", "W", 110]))
            .collect();
        json!({
            "resource": "leaguegamefinderresults",
            "resultSets": [{
                "name": "LeagueGameFinderResults",
                "headers": ["SEASON_ID", "TEAM_ID", "GAME_ID", "GAME_DATE", "MATCHUP", "WL", "PTS"],
                "rowSet": rows
            }]
        })
    }

    fn two_teams() -> Vec<Team> {
        fetch_teams()
            .into_iter()
            .filter(|t| t.abbreviation == "BOS" || t.abbreviation == "ATL")
            .collect()
    }

    #[test]
    fn test_fetch_teams_sorted_and_complete() {
        let teams = fetch_teams();
        assert_eq!(teams.len(), 30);
        assert!(teams.windows(2).all(|w| w[0].full_name <= w[1].full_name));
        assert_eq!(teams[0].full_name, "Atlanta Hawks");

        let lookup = team_lookup(&teams);
        assert_eq!(lookup[&1610612747].abbreviation, "LAL");
    }

    #[tokio::test]
    async fn test_fetch_team_games_one_call_per_team() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/leaguegamefinder"))
            .and(query_param("TeamID", "1610612737"))
            .and(header("referer", "https://www.nba.com/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(game_log(1610612737, &["001", "002"])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/leaguegamefinder"))
            .and(query_param("TeamID", "1610612738"))
            .respond_with(ResponseTemplate::new(200).set_body_json(game_log(1610612738, &["001"])))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = DataFetcher::new(&server.uri()).unwrap();
        let frame = fetcher.fetch_team_games(&two_teams()).await.unwrap();

        assert_eq!(frame.len(), 3);
        assert_eq!(frame.columns().last().map(String::as_str), Some("DATE_TIME_PROCESSED"));
        let team_idx = frame.column_index("TEAM_ID").unwrap();
        assert_eq!(frame.rows()[0][team_idx], Cell::Int(1610612737));
        assert_eq!(frame.rows()[2][team_idx], Cell::Int(1610612738));
    }

    #[tokio::test]
    async fn test_fetch_error_status_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/leaguegamefinder"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let fetcher = DataFetcher::new(&server.uri()).unwrap();
        let err = fetcher.fetch_team_games(&two_teams()).await.unwrap_err();
        assert!(err.to_string().contains("leaguegamefinder API error 500"));
    }

    #[tokio::test]
    async fn test_fetch_player_season_stats_tags_season_and_text_columns() {
        let server = MockServer::start().await;

        for (season, nickname) in [("2023-24", json!("Bron")), ("2024-25", json!(23))] {
            Mock::given(method("GET"))
                .and(path("/leaguedashplayerstats"))
                .and(query_param("Season", season))
                .and(query_param("PerMode", "PerGame"))
                .and(query_param("SeasonType", "Regular Season"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "resultSets": [{
                        "name": "LeagueDashPlayerStats",
                        "headers": ["PLAYER_ID", "PLAYER_NAME", "NICKNAME", "TEAM_ABBREVIATION", "PTS"],
                        "rowSet": [[2544, "LeBron James", nickname, "LAL", 25.7]]
                    }]
                })))
                .mount(&server)
                .await;
        }

        let fetcher = DataFetcher::new(&server.uri()).unwrap();
        let seasons = vec!["2023-24".to_string(), "2024-25".to_string()];
        let frame = fetcher.fetch_player_season_stats(&seasons).await.unwrap();

        assert_eq!(frame.len(), 2);
        let season_idx = frame.column_index("SEASON").unwrap();
        let nick_idx = frame.column_index("NICKNAME").unwrap();
        assert_eq!(frame.rows()[0][season_idx], Cell::from("2023-24"));
        assert_eq!(frame.rows()[1][season_idx], Cell::from("2024-25"));
        assert_eq!(frame.rows()[1][nick_idx], Cell::from("23"));
    }

    #[tokio::test]
    async fn test_fetch_players_maps_roster_rows() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/commonallplayers"))
            .and(query_param("IsOnlyCurrentSeason", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resultSets": [{
                    "name": "CommonAllPlayers",
                    "headers": ["PERSON_ID", "DISPLAY_LAST_COMMA_FIRST", "DISPLAY_FIRST_LAST", "ROSTERSTATUS"],
                    "rowSet": [
                        [2544, "James, LeBron", "LeBron James", 1],
                        [76001, "Abdelnaby, Alaa", "Alaa Abdelnaby", 0]
                    ]
                }]
            })))
            .mount(&server)
            .await;

        let fetcher = DataFetcher::new(&server.uri()).unwrap();
        let players = fetcher.fetch_players("2024-25").await.unwrap();

        assert_eq!(players.len(), 2);
        assert_eq!(players[0].first_name, "LeBron");
        assert_eq!(players[0].last_name, "James");
        assert!(players[0].is_active);
        assert!(!players[1].is_active);
    }
}
