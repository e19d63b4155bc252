//! The Odds API v4 client (head-to-head market, decimal odds).

use super::{http_client, parse_records, read_body, DirectRateLimiter, FetchOutcome};
use crate::config::Config;
use crate::error::FeedError;
use crate::model::RawPriceQuote;
use anyhow::Result;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use tracing::{info, warn};

/// The Odds API limit
const REQUESTS_PER_MINUTE: u32 = 45;

pub struct OddsApiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    regions: String,
    rate_limiter: DirectRateLimiter,
}

impl OddsApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let per_minute = NonZeroU32::new(REQUESTS_PER_MINUTE).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            http_client: http_client()?,
            base_url: config.odds_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.odds_api_key.clone(),
            regions: config.odds_regions.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    /// Upcoming events with h2h prices for one sport key. Never fails:
    /// problems come back as a non-ok status.
    pub async fn fetch_prices(&self, sport_key: &str) -> FetchOutcome<RawPriceQuote> {
        let Some(api_key) = self.api_key.as_deref() else {
            return FetchOutcome::skipped("no odds API key configured");
        };

        match self.try_fetch(sport_key, api_key).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Price feed unavailable for {}: {}", sport_key, e);
                FetchOutcome::failed(format!("{}: {}", sport_key, e))
            }
        }
    }

    async fn try_fetch(
        &self,
        sport_key: &str,
        api_key: &str,
    ) -> Result<FetchOutcome<RawPriceQuote>, FeedError> {
        // Wait for rate limit
        self.rate_limiter.until_ready().await;

        let url = format!("{}/v4/sports/{}/odds", self.base_url, sport_key);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("apiKey", api_key),
                ("regions", self.regions.as_str()),
                ("markets", "h2h"),
                ("oddsFormat", "decimal"),
                ("dateFormat", "iso"),
            ])
            .send()
            .await?;

        // Log API usage from headers
        if let Some(remaining) = response.headers().get("x-requests-remaining") {
            info!(
                "API requests remaining: {}",
                remaining.to_str().unwrap_or("?")
            );
        }

        let body = read_body(response).await?;
        let events: Vec<serde_json::Value> = serde_json::from_str(&body)?;

        let (quotes, malformed) =
            parse_records(events, "the-odds-api", |q: RawPriceQuote| Ok::<_, String>(q));

        info!(
            "Fetched {} events for {} from The Odds API ({} malformed)",
            quotes.len(),
            sport_key,
            malformed
        );
        Ok(FetchOutcome::ok(quotes, malformed))
    }
}
