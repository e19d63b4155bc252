//! `/health` endpoint state.

use crate::engine::ReconcileStats;
use crate::feeds::FetchStatus;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub finished_at: Option<DateTime<Utc>>,
    pub fixture_count: usize,
    pub upcoming_count: usize,
    pub real_prices: usize,
    pub synthetic_prices: usize,
    pub fixture_feed: Option<FetchStatus>,
    pub price_feed: Option<FetchStatus>,
}

/// Service health state
#[derive(Clone, Default)]
pub struct HealthState {
    pub last_run: Arc<RwLock<RunSummary>>,
    pub error_count: Arc<RwLock<usize>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_success(
        &self,
        stats: &ReconcileStats,
        fixture_feed: &FetchStatus,
        price_feed: &FetchStatus,
    ) {
        *self.last_run.write().await = RunSummary {
            finished_at: Some(Utc::now()),
            fixture_count: stats.finished + stats.live + stats.upcoming,
            upcoming_count: stats.upcoming,
            real_prices: stats.real_prices,
            synthetic_prices: stats.synthetic_prices,
            fixture_feed: Some(fixture_feed.clone()),
            price_feed: Some(price_feed.clone()),
        };
        *self.error_count.write().await = 0;
    }

    pub async fn record_error(&self) {
        *self.error_count.write().await += 1;
    }

    pub async fn consecutive_errors(&self) -> usize {
        *self.error_count.read().await
    }
}

pub fn router(health: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(health)
}

/// Health check handler
async fn health_handler(
    State(health): State<HealthState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let last_run = health.last_run.read().await.clone();
    let errors = health.consecutive_errors().await;

    let status = if errors > 5 { "degraded" } else { "ok" };

    let http_status = if errors > 10 {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        http_status,
        Json(json!({
            "service": "fixture-odds-sync",
            "version": env!("CARGO_PKG_VERSION"),
            "status": status,
            "last_run": last_run.finished_at.map(|t| t.to_rfc3339()),
            "last_fixture_count": last_run.fixture_count,
            "last_upcoming_count": last_run.upcoming_count,
            "last_real_prices": last_run.real_prices,
            "last_synthetic_prices": last_run.synthetic_prices,
            "fixture_feed": last_run.fixture_feed,
            "price_feed": last_run.price_feed,
            "consecutive_errors": errors
        })),
    )
}
