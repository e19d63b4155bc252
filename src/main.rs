//! Football fixture/odds sync service.
//!
//! Pulls fixtures from football-data.org and h2h prices from The Odds API,
//! reconciles them and writes the snapshot the front end reads.

use anyhow::Result;
use fixture_odds_sync::health;
use fixture_odds_sync::service::SyncService;
use fixture_odds_sync::Config;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Local runs may keep credentials in .env; containers use secrets.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("fixture_odds_sync=info".parse()?),
        )
        .init();

    info!("Fixture odds sync v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    if config.odds_api_key.is_none() {
        warn!("THE_ODDS_API_KEY not set; upcoming fixtures will carry synthetic prices only");
    }
    info!("Configuration: {:?}", config);

    let health_port = config.health_port;
    let run_once = config.run_once;

    let service = SyncService::new(config)?;

    // Check if running in one-shot mode (cron / CI trigger)
    if run_once {
        info!("Running in one-shot mode (RUN_ONCE=true)");
        match service.run_once().await {
            Ok(report) => {
                info!(
                    "One-shot sync completed: {} upcoming fixtures (fixtures: {}, prices: {})",
                    report.stats.upcoming, report.fixture_feed, report.price_feed
                );
            }
            Err(e) => {
                error!("One-shot sync failed: {:?}", e);
                return Err(e);
            }
        }
        return Ok(());
    }

    // Start health check server
    let app = health::router(service.health());
    let health_addr = format!("0.0.0.0:{}", health_port);
    info!("Health endpoint listening on {}", health_addr);

    let listener = tokio::net::TcpListener::bind(&health_addr).await?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Health server stopped: {}", e);
        }
    });

    // Handle shutdown gracefully (continuous mode)
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tokio::select! {
        result = service.run() => {
            if let Err(e) = result {
                error!("Service error: {:?}", e);
            }
        }
        _ = ctrl_c => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
