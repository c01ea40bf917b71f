use chrono::NaiveDate;
use std::env;

use crate::error::ConfigError;

pub const DEFAULT_STATS_BASE_URL: &str = "https://stats.nba.com/stats";
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_SEASONS: [&str; 5] = ["2020-21", "2021-22", "2022-23", "2023-24", "2024-25"];

/// Games on or after this date are left out of the team-games load.
pub fn default_game_date_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 3).unwrap_or_default()
}

/// Stats API root, for commands that never touch the warehouse.
pub fn stats_base_url_from_env() -> String {
    stats_base_url(env::var("NBA_STATS_BASE_URL").ok())
}

fn stats_base_url(raw: Option<String>) -> String {
    raw.filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATS_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Runtime configuration, built once in `main` and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_key: String,
    pub stats_base_url: String,
    pub chunk_size: usize,
    pub game_date_cutoff: NaiveDate,
    pub seasons: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables (after `.env` has been read)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let supabase_url = required("SUPABASE_URL")?;
        let supabase_key = required("SUPABASE_KEY")?;

        let stats_base_url = stats_base_url(lookup("NBA_STATS_BASE_URL"));

        let chunk_size = match lookup("UPSERT_CHUNK_SIZE") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "UPSERT_CHUNK_SIZE",
                        reason: format!("expected a positive integer, got '{}'", raw),
                    })
                }
            },
            None => DEFAULT_CHUNK_SIZE,
        };

        let game_date_cutoff = match lookup("GAME_DATE_CUTOFF") {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                ConfigError::Invalid {
                    var: "GAME_DATE_CUTOFF",
                    reason: e.to_string(),
                }
            })?,
            None => default_game_date_cutoff(),
        };

        let seasons = match lookup("ETL_SEASONS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_SEASONS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_key,
            stats_base_url,
            chunk_size,
            game_date_cutoff,
            seasons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://example.supabase.co/"),
            ("SUPABASE_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.supabase_url, "https://example.supabase.co");
        assert_eq!(config.stats_base_url, DEFAULT_STATS_BASE_URL);
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.game_date_cutoff, NaiveDate::from_ymd_opt(2025, 12, 3).unwrap());
        assert_eq!(config.seasons.len(), 5);
        assert_eq!(config.seasons[0], "2020-21");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = Config::from_lookup(lookup_from(&[("SUPABASE_URL", "https://x")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SUPABASE_KEY"));

        let err = Config::from_lookup(lookup_from(&[("SUPABASE_KEY", "k")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SUPABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://x"),
            ("SUPABASE_KEY", "k"),
            ("UPSERT_CHUNK_SIZE", "250"),
            ("GAME_DATE_CUTOFF", "2024-06-30"),
            ("ETL_SEASONS", "2023-24, 2024-25"),
        ]))
        .unwrap();

        assert_eq!(config.chunk_size, 250);
        assert_eq!(config.game_date_cutoff, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(config.seasons, vec!["2023-24", "2024-25"]);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://x"),
            ("SUPABASE_KEY", "k"),
            ("UPSERT_CHUNK_SIZE", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "UPSERT_CHUNK_SIZE", .. }));
    }
}
