//! Records flowing through a sync run: raw feed records in, snapshot out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A fixture as reported by the football-data.org feed.
///
/// `status` keeps the raw code so that codes unknown to the classifier
/// survive into the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFixture {
    pub id: u64,
    #[serde(rename = "date")]
    pub kickoff: DateTime<Utc>,
    pub status: String,
    #[serde(rename = "competition")]
    pub competition_name: String,
    pub competition_code: String,
    pub home_team: String,
    pub away_team: String,
    pub home_crest: String,
    pub away_crest: String,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
}

/// The Odds API event structure (decimal odds format)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RawPriceQuote {
    pub id: String,
    #[serde(default)]
    pub sport_key: String,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Bookmaker {
    pub key: String,
    pub title: String,
    pub last_update: Option<DateTime<Utc>>,
    pub markets: Vec<Market>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Market {
    pub key: String,
    pub last_update: Option<DateTime<Utc>>,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Outcome {
    pub name: String,
    pub price: Option<f64>,
}

impl Bookmaker {
    /// Head-to-head market, if the bookmaker offers one
    pub fn h2h(&self) -> Option<&Market> {
        self.markets.iter().find(|m| m.key == "h2h")
    }

    /// Display name used in provenance tags
    pub fn label(&self) -> &str {
        if self.key.is_empty() {
            &self.title
        } else {
            &self.key
        }
    }
}

impl Market {
    pub fn price_of(&self, outcome_name: &str) -> Option<f64> {
        self.outcomes
            .iter()
            .find(|o| o.name == outcome_name)
            .and_then(|o| o.price)
    }
}

/// Decimal 1X2 prices. All three are finite and strictly above 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTriple {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl PriceTriple {
    /// Builds a triple only if every price is a usable decimal price.
    pub fn checked(home: f64, draw: f64, away: f64) -> Option<Self> {
        let valid = |p: f64| p.is_finite() && p > 1.0;
        if valid(home) && valid(draw) && valid(away) {
            Some(Self { home, draw, away })
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        Self::checked(self.home, self.draw, self.away).is_some()
    }
}

/// Where a price came from. Serialized as `real:<bookmaker>` or `synthetic`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provenance {
    Real { bookmaker: String },
    Synthetic,
}

impl Provenance {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Provenance::Synthetic)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Real { bookmaker } => write!(f, "real:{}", bookmaker),
            Provenance::Synthetic => f.write_str("synthetic"),
        }
    }
}

impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Provenance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "synthetic" {
            return Ok(Provenance::Synthetic);
        }
        match raw.strip_prefix("real:") {
            Some(bookmaker) => Ok(Provenance::Real {
                bookmaker: bookmaker.to_string(),
            }),
            None => Err(serde::de::Error::custom(format!(
                "unknown price source '{}'",
                raw
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleBucket {
    Finished,
    Live,
    Upcoming,
}

impl LifecycleBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleBucket::Finished => "finished",
            LifecycleBucket::Live => "live",
            LifecycleBucket::Upcoming => "upcoming",
        }
    }
}

impl fmt::Display for LifecycleBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixture after classification and (for upcoming fixtures) pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledFixture {
    #[serde(flatten)]
    pub fixture: RawFixture,
    pub bucket: LifecycleBucket,
    pub price: Option<PriceTriple>,
    pub price_source: Option<Provenance>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub demo: bool,
}

impl ReconciledFixture {
    pub fn unpriced(fixture: RawFixture, bucket: LifecycleBucket) -> Self {
        Self {
            fixture,
            bucket,
            price: None,
            price_source: None,
            demo: false,
        }
    }
}

/// Canonical snapshot layout: one list per lifecycle bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub demo: bool,
    pub finished: Vec<ReconciledFixture>,
    pub live: Vec<ReconciledFixture>,
    pub upcoming: Vec<ReconciledFixture>,
}

impl SnapshotDocument {
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            demo: false,
            finished: Vec::new(),
            live: Vec::new(),
            upcoming: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.finished.len() + self.live.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All fixtures, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = &ReconciledFixture> {
        self.finished
            .iter()
            .chain(self.live.iter())
            .chain(self.upcoming.iter())
    }
}

/// Flat fixture record read by the `dados_futebol.json` front end.
///
/// Prices are `null` for results; scores are `null` until a result exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyFixture {
    pub id: u64,
    pub data: DateTime<Utc>,
    pub liga: String,
    pub status: String,
    pub time_casa: String,
    pub time_fora: String,
    pub brasao_casa: String,
    pub brasao_fora: String,
    pub placar_casa: Option<u32>,
    pub placar_fora: Option<u32>,
    pub odds_casa: Option<f64>,
    pub odds_empate: Option<f64>,
    pub odds_fora: Option<f64>,
    pub fonte_odds: Option<Provenance>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub demo: bool,
}

impl From<&ReconciledFixture> for LegacyFixture {
    fn from(rec: &ReconciledFixture) -> Self {
        let f = &rec.fixture;
        Self {
            id: f.id,
            data: f.kickoff,
            liga: f.competition_name.clone(),
            status: f.status.clone(),
            time_casa: f.home_team.clone(),
            time_fora: f.away_team.clone(),
            brasao_casa: f.home_crest.clone(),
            brasao_fora: f.away_crest.clone(),
            placar_casa: f.home_goals,
            placar_fora: f.away_goals,
            odds_casa: rec.price.map(|p| p.home),
            odds_empate: rec.price.map(|p| p.draw),
            odds_fora: rec.price.map(|p| p.away),
            fonte_odds: rec.price_source.clone(),
            demo: rec.demo,
        }
    }
}

/// Two-bucket view read by older front ends: results (live first, then
/// finished) and upcoming fixtures, as flat records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacySnapshot {
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub demo: bool,
    pub resultados: Vec<LegacyFixture>,
    pub proximos: Vec<LegacyFixture>,
}

impl From<&SnapshotDocument> for LegacySnapshot {
    fn from(doc: &SnapshotDocument) -> Self {
        let resultados = doc
            .live
            .iter()
            .chain(doc.finished.iter())
            .map(LegacyFixture::from)
            .collect();
        Self {
            generated_at: doc.generated_at,
            demo: doc.demo,
            resultados,
            proximos: doc.upcoming.iter().map(LegacyFixture::from).collect(),
        }
    }
}
