//! football-data.org v4 fixture client.

use super::{http_client, parse_records, read_body, DirectRateLimiter, FetchOutcome};
use crate::config::Config;
use crate::error::FeedError;
use crate::model::RawFixture;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use tracing::{info, warn};

/// Free tier allows 10 requests per minute
const REQUESTS_PER_MINUTE: u32 = 10;

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMatch {
    id: u64,
    utc_date: DateTime<Utc>,
    status: String,
    competition: ApiCompetition,
    home_team: ApiTeam,
    away_team: ApiTeam,
    #[serde(default)]
    score: ApiScore,
}

#[derive(Debug, Deserialize)]
struct ApiCompetition {
    #[serde(default)]
    name: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTeam {
    name: Option<String>,
    short_name: Option<String>,
    crest: Option<String>,
}

impl ApiTeam {
    /// Short name when present, full name otherwise
    fn display_name(&self) -> Option<String> {
        [&self.short_name, &self.name]
            .into_iter()
            .flatten()
            .map(|n| n.trim())
            .find(|n| !n.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ApiScore {
    full_time: ApiGoals,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ApiGoals {
    home: Option<u32>,
    away: Option<u32>,
}

impl TryFrom<ApiMatch> for RawFixture {
    type Error = String;

    fn try_from(m: ApiMatch) -> Result<Self, Self::Error> {
        let home_team = m
            .home_team
            .display_name()
            .ok_or_else(|| format!("match {} has no home team name", m.id))?;
        let away_team = m
            .away_team
            .display_name()
            .ok_or_else(|| format!("match {} has no away team name", m.id))?;

        Ok(RawFixture {
            id: m.id,
            kickoff: m.utc_date,
            status: m.status,
            competition_name: m.competition.name,
            competition_code: m.competition.code,
            home_team,
            away_team,
            home_crest: m.home_team.crest.unwrap_or_default(),
            away_crest: m.away_team.crest.unwrap_or_default(),
            home_goals: m.score.full_time.home,
            away_goals: m.score.full_time.away,
        })
    }
}

pub struct FootballDataClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
    rate_limiter: DirectRateLimiter,
}

impl FootballDataClient {
    pub fn new(config: &Config) -> Result<Self> {
        let per_minute = NonZeroU32::new(REQUESTS_PER_MINUTE).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            http_client: http_client()?,
            base_url: config.football_data_base_url.trim_end_matches('/').to_string(),
            token: config.football_data_token.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    /// Fixtures of the given competitions kicking off between the two dates
    /// (inclusive). Never fails: problems come back as a non-ok status.
    pub async fn fetch_fixtures(
        &self,
        competitions: &[String],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> FetchOutcome<RawFixture> {
        match self.try_fetch(competitions, date_from, date_to).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Fixture feed unavailable: {}", e);
                FetchOutcome::failed(e.to_string())
            }
        }
    }

    async fn try_fetch(
        &self,
        competitions: &[String],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<FetchOutcome<RawFixture>, FeedError> {
        // Wait for rate limit
        self.rate_limiter.until_ready().await;

        let url = format!("{}/v4/matches", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .header("X-Auth-Token", &self.token)
            .query(&[
                ("competitions", competitions.join(",")),
                ("dateFrom", date_from.format("%Y-%m-%d").to_string()),
                ("dateTo", date_to.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await?;

        let body = read_body(response).await?;
        let parsed: MatchesResponse = serde_json::from_str(&body)?;

        let (fixtures, malformed) =
            parse_records(parsed.matches, "football-data", |m: ApiMatch| RawFixture::try_from(m));

        info!(
            "Fetched {} fixtures from football-data.org ({} malformed)",
            fixtures.len(),
            malformed
        );
        Ok(FetchOutcome::ok(fixtures, malformed))
    }
}
