//! HTTP clients for the two upstream feeds.
//!
//! Neither client returns an error to the caller. A failed call becomes an
//! empty batch whose [`FetchStatus`] says why, so a run can tell "the feed
//! was down" from "there are no fixtures today" while treating both the same.

pub mod football_data;
pub mod odds_api;

pub use football_data::FootballDataClient;
pub use odds_api::OddsApiClient;

use crate::error::FeedError;
use anyhow::{Context, Result};
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, RateLimiter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::warn;

pub(crate) type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FetchStatus {
    Ok,
    /// The call failed; the batch is empty.
    Failed { reason: String },
    /// The call was not made (e.g. no credentials configured).
    Skipped { reason: String },
}

impl FetchStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, FetchStatus::Ok)
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Ok => f.write_str("ok"),
            FetchStatus::Failed { reason } => write!(f, "failed: {}", reason),
            FetchStatus::Skipped { reason } => write!(f, "skipped: {}", reason),
        }
    }
}

/// A batch of records plus how the fetch went.
#[derive(Debug, Clone)]
pub struct FetchOutcome<T> {
    pub records: Vec<T>,
    pub status: FetchStatus,
    /// Records dropped because they could not be parsed
    pub malformed: usize,
}

impl<T> FetchOutcome<T> {
    pub fn ok(records: Vec<T>, malformed: usize) -> Self {
        Self {
            records,
            status: FetchStatus::Ok,
            malformed,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            status: FetchStatus::Failed {
                reason: reason.into(),
            },
            malformed: 0,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            status: FetchStatus::Skipped {
                reason: reason.into(),
            },
            malformed: 0,
        }
    }

    /// Fold several outcomes of the same feed into one, keeping input order.
    /// The merged status is `Ok` if any part succeeded, otherwise the first
    /// non-ok status.
    pub fn merge(parts: Vec<FetchOutcome<T>>) -> Self {
        let mut records = Vec::new();
        let mut malformed = 0;
        let mut any_ok = false;
        let mut first_problem = None;

        for part in parts {
            records.extend(part.records);
            malformed += part.malformed;
            if part.status.is_ok() {
                any_ok = true;
            } else if first_problem.is_none() {
                first_problem = Some(part.status);
            }
        }

        let status = match (any_ok, first_problem) {
            (true, _) | (false, None) => FetchStatus::Ok,
            (false, Some(problem)) => problem,
        };

        Self {
            records,
            status,
            malformed,
        }
    }
}

/// HTTP client with timeouts
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(5)
        .build()
        .context("Failed to create HTTP client")
}

/// Read the body and fail on a non-success status.
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String, FeedError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(FeedError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Parse each element of a JSON array on its own so one bad record does not
/// sink the batch. Returns the parsed records and the number skipped.
pub(crate) fn parse_records<W, T, F>(
    items: Vec<serde_json::Value>,
    feed: &str,
    convert: F,
) -> (Vec<T>, usize)
where
    W: DeserializeOwned,
    F: Fn(W) -> Result<T, String>,
{
    let mut records = Vec::with_capacity(items.len());
    let mut malformed = 0;

    for (index, item) in items.into_iter().enumerate() {
        let parsed = serde_json::from_value::<W>(item)
            .map_err(|e| e.to_string())
            .and_then(&convert);

        match parsed {
            Ok(record) => records.push(record),
            Err(reason) => {
                malformed += 1;
                let err = FeedError::MalformedRecord { index, reason };
                warn!(feed, "skipping record: {}", err);
            }
        }
    }

    (records, malformed)
}
