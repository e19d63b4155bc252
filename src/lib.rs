//! Football fixture and odds reconciliation.
//!
//! Merges the football-data.org fixture feed with head-to-head prices from
//! The Odds API into a single snapshot document for the front end.
//!
//! The engine (`classifier`, `similarity`, `matcher`, `fallback`, `engine`)
//! is pure and synchronous. Everything that talks to the outside world lives
//! in `feeds`, `writer`, `health` and `service`.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod feeds;
pub mod health;
pub mod matcher;
pub mod model;
pub mod service;
pub mod similarity;
pub mod writer;

pub use config::{Config, SnapshotLayout};
pub use engine::{ReconcileStats, Reconciliation, ReconciliationEngine};
pub use fallback::FallbackPolicy;
pub use matcher::{MatchedPrice, MatcherConfig, PriceMatcher};
pub use model::{
    LegacyFixture, LegacySnapshot, LifecycleBucket, PriceTriple, Provenance, RawFixture,
    RawPriceQuote, ReconciledFixture, SnapshotDocument,
};
