//! Process configuration, built once in `main` and passed by reference.

use crate::error::ConfigError;
use crate::fallback::{FallbackPolicy, DEFAULT_MARGIN};
use crate::matcher::{MatcherConfig, DEFAULT_THRESHOLD};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const FOOTBALL_DATA_TOKEN_SECRET: &str = "/run/secrets/football_data_token";
const ODDS_API_KEY_SECRET: &str = "/run/secrets/odds_api_key";

/// Upper bound for the look-back and look-ahead windows
pub const MAX_WINDOW_DAYS: i64 = 365;

/// football-data.org competition code → The Odds API sport key
const LEAGUE_MAP: &[(&str, &str)] = &[
    ("PL", "soccer_epl"),
    ("BSA", "soccer_brazil_campeonato"),
    ("PD", "soccer_spain_la_liga"),
    ("SA", "soccer_italy_serie_a"),
    ("BL1", "soccer_germany_bundesliga"),
    ("FL1", "soccer_france_ligue_one"),
    ("PPL", "soccer_portugal_primeira_liga"),
    ("DED", "soccer_netherlands_eredivisie"),
    ("ELC", "soccer_efl_champ"),
    ("CL", "soccer_uefa_champs_league"),
];

/// Odds API sport key for a football-data.org competition code
pub fn sport_key_for(competition: &str) -> Option<&'static str> {
    LEAGUE_MAP
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(competition))
        .map(|(_, key)| *key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotLayout {
    /// `finished` / `live` / `upcoming`
    Buckets,
    /// `resultados` / `proximos`
    Legacy,
}

impl FromStr for SnapshotLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buckets" | "three" => Ok(SnapshotLayout::Buckets),
            "legacy" | "two" => Ok(SnapshotLayout::Legacy),
            other => Err(format!("expected 'buckets' or 'legacy', got '{}'", other)),
        }
    }
}

/// Configuration
#[derive(Clone)]
pub struct Config {
    pub football_data_token: String,
    /// Price feed is skipped when absent
    pub odds_api_key: Option<String>,
    pub football_data_base_url: String,
    pub odds_api_base_url: String,
    pub odds_regions: String,
    /// Competition codes in feed order; price calls follow this order
    pub competitions: Vec<String>,
    pub lookback_days: i64,
    pub lookahead_days: i64,
    pub matcher: MatcherConfig,
    pub fallback: FallbackPolicy,
    pub demo_when_empty: bool,
    pub snapshot_path: PathBuf,
    pub snapshot_layout: SnapshotLayout,
    pub poll_interval: Duration,
    pub health_port: u16,
    /// If true, run once and exit (no polling loop)
    pub run_once: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("football_data_base_url", &self.football_data_base_url)
            .field("odds_api_base_url", &self.odds_api_base_url)
            .field("odds_api_key", &self.odds_api_key.as_ref().map(|_| "<redacted>"))
            .field("competitions", &self.competitions)
            .field("matcher", &self.matcher)
            .field("fallback", &self.fallback)
            .field("snapshot_path", &self.snapshot_path)
            .field("snapshot_layout", &self.snapshot_layout)
            .field("poll_interval", &self.poll_interval)
            .field("run_once", &self.run_once)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Secrets/config:
        // - Docker Compose: read from /run/secrets/*
        // - everywhere else: env vars, optionally seeded from .env
        Self::from_lookup(|name| std::env::var(name).ok(), read_secret_file)
    }

    /// Build from arbitrary variable and secret sources.
    pub fn from_lookup<V, S>(var: V, secret: S) -> Result<Self>
    where
        V: Fn(&str) -> Option<String>,
        S: Fn(&str) -> Option<String>,
    {
        let football_data_token = match var("FOOTBALL_DATA_API_TOKEN") {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            Some(_) => return Err(ConfigError::Empty("FOOTBALL_DATA_API_TOKEN").into()),
            None => secret(FOOTBALL_DATA_TOKEN_SECRET).ok_or(ConfigError::MissingSecret {
                name: "football-data.org token",
                env: "FOOTBALL_DATA_API_TOKEN",
                path: FOOTBALL_DATA_TOKEN_SECRET,
            })?,
        };
        reject_placeholder("FOOTBALL_DATA_API_TOKEN", &football_data_token)?;

        let odds_api_key = match var("THE_ODDS_API_KEY") {
            Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
            Some(_) => return Err(ConfigError::Empty("THE_ODDS_API_KEY").into()),
            None => secret(ODDS_API_KEY_SECRET),
        };
        if let Some(key) = &odds_api_key {
            reject_placeholder("THE_ODDS_API_KEY", key)?;
        }

        let competitions: Vec<String> = var("COMPETITIONS")
            .unwrap_or_else(|| "PL,BSA,PD,SA".to_string())
            .split(',')
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        if competitions.is_empty() {
            return Err(ConfigError::Empty("COMPETITIONS").into());
        }

        let threshold: f64 = parse_var(&var, "MATCH_THRESHOLD", DEFAULT_THRESHOLD)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                name: "MATCH_THRESHOLD",
                value: threshold.to_string(),
                reason: "must be between 0 and 1".to_string(),
            }
            .into());
        }

        let fallback = match var("FALLBACK_POLICY")
            .unwrap_or_else(|| "randomized".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "fixed" => FallbackPolicy::Fixed,
            "randomized" | "random" => FallbackPolicy::Randomized {
                margin: DEFAULT_MARGIN,
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "FALLBACK_POLICY",
                    value: other.to_string(),
                    reason: "expected 'fixed' or 'randomized'".to_string(),
                }
                .into())
            }
        };

        Ok(Self {
            football_data_token,
            odds_api_key,
            football_data_base_url: var("FOOTBALL_DATA_BASE_URL")
                .unwrap_or_else(|| "https://api.football-data.org".to_string()),
            odds_api_base_url: var("ODDS_API_BASE_URL")
                .unwrap_or_else(|| "https://api.the-odds-api.com".to_string()),
            odds_regions: var("ODDS_REGIONS").unwrap_or_else(|| "eu".to_string()),
            competitions,
            lookback_days: parse_days(&var, "LOOKBACK_DAYS", 3)?,
            lookahead_days: parse_days(&var, "LOOKAHEAD_DAYS", 7)?,
            matcher: MatcherConfig {
                threshold,
                preferred_bookmaker: var("PREFERRED_BOOKMAKER")
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty()),
            },
            fallback,
            demo_when_empty: parse_bool(&var, "DEMO_WHEN_EMPTY", true),
            snapshot_path: PathBuf::from(
                var("SNAPSHOT_PATH").unwrap_or_else(|| "dados_futebol.json".to_string()),
            ),
            snapshot_layout: parse_var(&var, "SNAPSHOT_LAYOUT", SnapshotLayout::Buckets)?,
            poll_interval: Duration::from_secs(parse_var(&var, "POLL_INTERVAL_SECONDS", 900)?),
            health_port: parse_var(&var, "HEALTH_PORT", 8083)?,
            run_once: parse_bool(&var, "RUN_ONCE", false),
        })
    }

    /// Competitions with a known Odds API sport key, in configured order.
    pub fn sport_keys(&self) -> Vec<(&str, &'static str)> {
        self.competitions
            .iter()
            .filter_map(|c| sport_key_for(c).map(|key| (c.as_str(), key)))
            .collect()
    }
}

/// Read a secret from a Docker secret file
fn read_secret_file(file_path: &str) -> Option<String> {
    std::fs::read_to_string(file_path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// Prevent accidental use of sample/placeholder keys
fn reject_placeholder(name: &'static str, value: &str) -> Result<()> {
    let lower = value.to_lowercase();
    if lower.contains("change_me") || lower.contains("your_") || lower.starts_with("sample") {
        return Err(ConfigError::Placeholder(name).into());
    }
    Ok(())
}

fn parse_var<V, T>(var: &V, name: &'static str, default: T) -> Result<T>
where
    V: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            })
            .with_context(|| format!("parsing {}", name)),
    }
}

fn parse_days<V>(var: &V, name: &'static str, default: i64) -> Result<i64>
where
    V: Fn(&str) -> Option<String>,
{
    let days: i64 = parse_var(var, name, default)?;
    if !(0..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(ConfigError::Invalid {
            name,
            value: days.to_string(),
            reason: format!("must be between 0 and {}", MAX_WINDOW_DAYS),
        }
        .into());
    }
    Ok(days)
}

fn parse_bool<V>(var: &V, name: &str, default: bool) -> bool
where
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(v) => matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}
