//! Sync service: fetch both feeds, reconcile, write the snapshot.

use crate::config::Config;
use crate::engine::{ReconcileStats, ReconciliationEngine};
use crate::feeds::{FetchOutcome, FetchStatus, FootballDataClient, OddsApiClient};
use crate::health::HealthState;
use crate::model::{RawFixture, RawPriceQuote};
use crate::writer::SnapshotWriter;
use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use tracing::{error, info, warn};

/// What one sync run did
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: ReconcileStats,
    pub fixture_feed: FetchStatus,
    pub price_feed: FetchStatus,
}

pub struct SyncService {
    config: Config,
    fixtures: FootballDataClient,
    prices: OddsApiClient,
    engine: ReconciliationEngine,
    writer: SnapshotWriter,
    health: HealthState,
}

impl SyncService {
    pub fn new(config: Config) -> Result<Self> {
        let fixtures = FootballDataClient::new(&config)?;
        let prices = OddsApiClient::new(&config)?;
        let engine = ReconciliationEngine::new(config.matcher.clone())
            .with_fallback(config.fallback)
            .with_demo_fixtures(config.demo_when_empty);
        let writer = SnapshotWriter::new(config.snapshot_path.clone(), config.snapshot_layout);

        Ok(Self {
            config,
            fixtures,
            prices,
            engine,
            writer,
            health: HealthState::new(),
        })
    }

    pub fn health(&self) -> HealthState {
        self.health.clone()
    }

    async fn fetch_fixtures(&self) -> FetchOutcome<RawFixture> {
        let today = Utc::now().date_naive();
        let Some((date_from, date_to)) =
            fetch_window(today, self.config.lookback_days, self.config.lookahead_days)
        else {
            return FetchOutcome::failed(format!(
                "fixture window around {} is out of range (-{}d/+{}d)",
                today, self.config.lookback_days, self.config.lookahead_days
            ));
        };

        self.fixtures
            .fetch_fixtures(&self.config.competitions, date_from, date_to)
            .await
    }

    /// One call per mapped competition, concatenated in configured order.
    async fn fetch_prices(&self) -> FetchOutcome<RawPriceQuote> {
        let sport_keys = self.config.sport_keys();
        if sport_keys.is_empty() {
            return FetchOutcome::skipped("no configured competition has an odds sport key");
        }

        let mut parts = Vec::with_capacity(sport_keys.len());
        for (competition, sport_key) in sport_keys {
            let outcome = self.prices.fetch_prices(sport_key).await;
            if !outcome.status.is_ok() {
                warn!("Prices for {} ({}): {}", competition, sport_key, outcome.status);
            }
            parts.push(outcome);
        }
        FetchOutcome::merge(parts)
    }

    /// Single sync iteration
    pub async fn sync_once(&self) -> Result<RunReport> {
        let fixtures = self.fetch_fixtures().await;
        if fixtures.status.is_ok() && fixtures.records.is_empty() {
            info!("Fixture feed returned no fixtures for the configured window");
        }

        let prices = self.fetch_prices().await;
        if let FetchStatus::Failed { reason } = &prices.status {
            warn!(
                "Price feed failed, all upcoming fixtures will be priced synthetically: {}",
                reason
            );
        }

        let result = self.engine.reconcile(
            &fixtures.records,
            &prices.records,
            Utc::now(),
            &mut rand::thread_rng(),
        );
        let stats = result.stats;

        info!(
            finished = stats.finished,
            live = stats.live,
            upcoming = stats.upcoming,
            real = stats.real_prices,
            synthetic = stats.synthetic_prices,
            anomalies = stats.status_anomalies,
            duplicates = stats.duplicates_dropped,
            demo = stats.demo,
            "Reconciled {} fixtures against {} quotes",
            fixtures.records.len(),
            prices.records.len()
        );

        self.writer
            .write(&result.document)
            .with_context(|| format!("writing snapshot to {}", self.writer.path().display()))?;

        Ok(RunReport {
            stats,
            fixture_feed: fixtures.status,
            price_feed: prices.status,
        })
    }

    /// Run once and update the health state.
    pub async fn run_once(&self) -> Result<RunReport> {
        match self.sync_once().await {
            Ok(report) => {
                self.health
                    .record_success(&report.stats, &report.fixture_feed, &report.price_feed)
                    .await;
                Ok(report)
            }
            Err(e) => {
                self.health.record_error().await;
                Err(e)
            }
        }
    }

    /// Main polling loop
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting sync loop (poll interval: {}s)",
            self.config.poll_interval.as_secs()
        );

        loop {
            let start = std::time::Instant::now();

            match self.run_once().await {
                Ok(report) => {
                    info!(
                        "Sync completed: {} upcoming fixtures in {:?} (fixtures: {}, prices: {})",
                        report.stats.upcoming,
                        start.elapsed(),
                        report.fixture_feed,
                        report.price_feed
                    );
                }
                Err(e) => {
                    error!("Sync failed: {:?}", e);
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

/// Date range `[today - lookback, today + lookahead]`, or `None` if either
/// end falls outside the calendar.
fn fetch_window(
    today: NaiveDate,
    lookback: i64,
    lookahead: i64,
) -> Option<(NaiveDate, NaiveDate)> {
    let from = today.checked_sub_signed(ChronoDuration::try_days(lookback)?)?;
    let to = today.checked_add_signed(ChronoDuration::try_days(lookahead)?)?;
    Some((from, to))
}
