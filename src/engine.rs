//! Reconciliation engine: raw batches in, snapshot document out.
//!
//! A run is a pure function of the two batches, `now` and the random source
//! handed to the fallback policy. Same inputs, same document.

use crate::classifier::classify;
use crate::fallback::FallbackPolicy;
use crate::matcher::{MatcherConfig, PriceMatcher};
use crate::model::{
    LifecycleBucket, Provenance, RawFixture, RawPriceQuote, ReconciledFixture, SnapshotDocument,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const DEMO_COMPETITION_CODE: &str = "DEMO";

/// Counters for one run, logged by the service and exposed on `/health`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub finished: usize,
    pub live: usize,
    pub upcoming: usize,
    pub real_prices: usize,
    pub synthetic_prices: usize,
    pub status_anomalies: usize,
    pub duplicates_dropped: usize,
    pub demo: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub document: SnapshotDocument,
    pub stats: ReconcileStats,
}

#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    matcher: PriceMatcher,
    fallback: FallbackPolicy,
    demo_when_empty: bool,
}

impl ReconciliationEngine {
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            matcher: PriceMatcher::new(config),
            fallback: FallbackPolicy::default(),
            demo_when_empty: false,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Substitute demonstration fixtures when the fixture batch is empty.
    pub fn with_demo_fixtures(mut self, enabled: bool) -> Self {
        self.demo_when_empty = enabled;
        self
    }

    pub fn reconcile<R: Rng>(
        &self,
        fixtures: &[RawFixture],
        quotes: &[RawPriceQuote],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Reconciliation {
        let mut stats = ReconcileStats::default();
        let mut document = SnapshotDocument::empty(now);

        let demo = fixtures.is_empty() && self.demo_when_empty;
        let demo_batch;
        let fixtures = if demo {
            demo_batch = demo_fixtures(now);
            stats.demo = true;
            document.demo = true;
            &demo_batch[..]
        } else {
            fixtures
        };

        let mut seen = HashSet::with_capacity(fixtures.len());

        for fixture in fixtures {
            if !seen.insert(fixture.id) {
                stats.duplicates_dropped += 1;
                debug!(fixture = fixture.id, "dropping duplicate fixture");
                continue;
            }

            let class = classify(&fixture.status);
            if class.anomaly {
                stats.status_anomalies += 1;
                warn!(
                    fixture = fixture.id,
                    status = %fixture.status,
                    "unrecognized fixture status, treating as upcoming"
                );
            }

            let mut rec = ReconciledFixture::unpriced(fixture.clone(), class.bucket);
            rec.demo = demo;

            match class.bucket {
                LifecycleBucket::Finished => document.finished.push(rec),
                LifecycleBucket::Live => document.live.push(rec),
                LifecycleBucket::Upcoming => {
                    self.price(&mut rec, quotes, rng, &mut stats);
                    document.upcoming.push(rec);
                }
            }
        }

        sort_bucket(&mut document.upcoming, SortOrder::Ascending);
        sort_bucket(&mut document.live, SortOrder::Ascending);
        sort_bucket(&mut document.finished, SortOrder::Descending);

        stats.finished = document.finished.len();
        stats.live = document.live.len();
        stats.upcoming = document.upcoming.len();

        Reconciliation { document, stats }
    }

    fn price<R: Rng>(
        &self,
        rec: &mut ReconciledFixture,
        quotes: &[RawPriceQuote],
        rng: &mut R,
        stats: &mut ReconcileStats,
    ) {
        let fixture = &rec.fixture;
        match self.matcher.match_fixture(
            &fixture.home_team,
            &fixture.away_team,
            fixture.kickoff,
            quotes,
        ) {
            Some(matched) => {
                rec.price = Some(matched.price);
                rec.price_source = Some(Provenance::Real {
                    bookmaker: matched.bookmaker,
                });
                stats.real_prices += 1;
            }
            None => {
                rec.price = Some(self.fallback.generate(rng));
                rec.price_source = Some(Provenance::Synthetic);
                stats.synthetic_prices += 1;
            }
        }
    }
}

#[derive(Clone, Copy)]
enum SortOrder {
    Ascending,
    Descending,
}

/// Kickoff order, ties broken by ascending id so the order is total.
fn sort_bucket(bucket: &mut [ReconciledFixture], order: SortOrder) {
    bucket.sort_by(|a, b| {
        let by_time = a.fixture.kickoff.cmp(&b.fixture.kickoff);
        let by_time = match order {
            SortOrder::Ascending => by_time,
            SortOrder::Descending => by_time.reverse(),
        };
        by_time.then_with(|| a.fixture.id.cmp(&b.fixture.id))
    });
}

/// Three upcoming fixtures on the days after `now`, stable for a given date.
pub fn demo_fixtures(now: DateTime<Utc>) -> Vec<RawFixture> {
    let today = now.date_naive();
    let at = |days: i64, hour: u32, minute: u32| {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
        (today + Duration::days(days)).and_time(time).and_utc()
    };

    let demo = |id: u64, kickoff: DateTime<Utc>, home: &str, away: &str| RawFixture {
        id,
        kickoff,
        status: "SCHEDULED".to_string(),
        competition_name: "Demonstração".to_string(),
        competition_code: DEMO_COMPETITION_CODE.to_string(),
        home_team: home.to_string(),
        away_team: away.to_string(),
        home_crest: String::new(),
        away_crest: String::new(),
        home_goals: None,
        away_goals: None,
    };

    vec![
        demo(900_001, at(1, 19, 0), "Flamengo", "Palmeiras"),
        demo(900_002, at(1, 21, 30), "Corinthians", "São Paulo"),
        demo(900_003, at(2, 16, 0), "Grêmio", "Internacional"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FIXED_TRIPLE;
    use crate::model::{Bookmaker, Market, Outcome, PriceTriple};
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn fixture(
        id: u64,
        status: &str,
        kickoff: DateTime<Utc>,
        home: &str,
        away: &str,
    ) -> RawFixture {
        RawFixture {
            id,
            kickoff,
            status: status.to_string(),
            competition_name: "Campeonato Brasileiro Série A".to_string(),
            competition_code: "BSA".to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_crest: format!("https://crests.football-data.org/{}.png", id),
            away_crest: String::new(),
            home_goals: None,
            away_goals: None,
        }
    }

    fn quote(
        id: &str,
        kickoff: DateTime<Utc>,
        home: &str,
        away: &str,
        p: [f64; 3],
    ) -> RawPriceQuote {
        RawPriceQuote {
            id: id.to_string(),
            sport_key: "soccer_brazil_campeonato".to_string(),
            commence_time: kickoff,
            home_team: home.to_string(),
            away_team: away.to_string(),
            bookmakers: vec![Bookmaker {
                key: "pinnacle".to_string(),
                title: "Pinnacle".to_string(),
                last_update: None,
                markets: vec![Market {
                    key: "h2h".to_string(),
                    last_update: None,
                    outcomes: vec![
                        Outcome {
                            name: home.to_string(),
                            price: Some(p[0]),
                        },
                        Outcome {
                            name: "Draw".to_string(),
                            price: Some(p[1]),
                        },
                        Outcome {
                            name: away.to_string(),
                            price: Some(p[2]),
                        },
                    ],
                }],
            }],
        }
    }

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::new(MatcherConfig::default())
    }

    fn mixed_batch() -> Vec<RawFixture> {
        let mut finished = fixture(1, "FINISHED", at(1, 16), "Botafogo", "Fluminense");
        finished.home_goals = Some(2);
        finished.away_goals = Some(1);
        vec![
            finished,
            fixture(2, "IN_PLAY", at(1, 19), "Bahia", "Fortaleza"),
            fixture(3, "SCHEDULED", at(1, 22), "Flamengo", "Vasco da Gama"),
            fixture(4, "TIMED", at(3, 20), "Santos", "Cruzeiro"),
            fixture(5, "CANCELLED", at(2, 20), "Ceará", "Sport"),
            fixture(6, "FINISHED", at(1, 14), "Grêmio", "Internacional"),
            fixture(7, "PAUSED", at(1, 19), "Athletico-PR", "Coritiba"),
        ]
    }

    fn flamengo_quotes() -> Vec<RawPriceQuote> {
        vec![quote(
            "q1",
            at(1, 22),
            "CR Flamengo",
            "CR Vasco da Gama",
            [1.80, 3.40, 4.20],
        )]
    }

    #[test]
    fn test_buckets_partition_fixtures() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = engine().reconcile(&mixed_batch(), &flamengo_quotes(), at(1, 20), &mut rng);
        let doc = &out.document;

        let ids = |b: &[ReconciledFixture]| b.iter().map(|f| f.fixture.id).collect::<Vec<_>>();
        assert_eq!(ids(&doc.finished), vec![1, 6]);
        assert_eq!(ids(&doc.live), vec![2, 7]);
        assert_eq!(ids(&doc.upcoming), vec![3, 5, 4]);

        let mut all: Vec<u64> = doc.iter().map(|f| f.fixture.id).collect();
        all.sort_unstable();
        assert_eq!(all, vec![1, 2, 3, 4, 5, 6, 7]);

        assert_eq!(out.stats.status_anomalies, 1);
        assert_eq!(out.stats.real_prices, 1);
        assert_eq!(out.stats.synthetic_prices, 2);
        assert!(!doc.demo);
    }

    #[test]
    fn test_finished_fixture_passes_through_unpriced() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = engine().reconcile(&mixed_batch(), &flamengo_quotes(), at(1, 20), &mut rng);
        let finished = &out.document.finished[0];
        assert_eq!(finished.fixture.id, 1);
        assert_eq!(finished.fixture.home_goals, Some(2));
        assert_eq!(finished.fixture.away_goals, Some(1));
        assert!(finished.price.is_none());
        assert!(finished.price_source.is_none());
        assert!(out.document.live.iter().all(|f| f.price.is_none()));
    }

    #[test]
    fn test_matched_fixture_carries_real_price() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = engine().reconcile(&mixed_batch(), &flamengo_quotes(), at(1, 20), &mut rng);
        let flamengo = out
            .document
            .upcoming
            .iter()
            .find(|f| f.fixture.id == 3)
            .unwrap();
        assert_eq!(
            flamengo.price,
            Some(PriceTriple {
                home: 1.80,
                draw: 3.40,
                away: 4.20
            })
        );
        assert_eq!(
            flamengo.price_source,
            Some(Provenance::Real {
                bookmaker: "pinnacle".to_string()
            })
        );
    }

    #[test]
    fn test_quote_on_other_day_falls_back() {
        let quotes = vec![quote(
            "q1",
            at(2, 22),
            "CR Flamengo",
            "CR Vasco da Gama",
            [1.80, 3.40, 4.20],
        )];
        let fixtures = vec![fixture(3, "SCHEDULED", at(1, 22), "Flamengo", "Vasco da Gama")];
        let mut rng = StdRng::seed_from_u64(9);
        let out = engine().reconcile(&fixtures, &quotes, at(1, 12), &mut rng);

        let rec = &out.document.upcoming[0];
        assert_eq!(rec.price_source, Some(Provenance::Synthetic));
        assert!(rec.price.unwrap().is_valid());
    }

    #[test]
    fn test_every_upcoming_fixture_is_priced() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = engine().reconcile(&mixed_batch(), &[], at(1, 20), &mut rng);
        assert!(!out.document.upcoming.is_empty());
        for f in &out.document.upcoming {
            assert!(f.price.expect("priced").is_valid());
            assert_eq!(f.price_source, Some(Provenance::Synthetic));
        }
    }

    #[test]
    fn test_empty_quotes_keep_partition_of_unmatched_run() {
        let unmatched = vec![quote(
            "q9",
            at(1, 22),
            "Manchester City",
            "Arsenal",
            [1.5, 4.0, 6.0],
        )];
        let e = engine().with_fallback(FallbackPolicy::Fixed);
        let mut rng = StdRng::seed_from_u64(1);
        let a = e.reconcile(&mixed_batch(), &[], at(1, 20), &mut rng);
        let b = e.reconcile(&mixed_batch(), &unmatched, at(1, 20), &mut rng);
        assert_eq!(a.document, b.document);
        assert!(a
            .document
            .upcoming
            .iter()
            .all(|f| f.price == Some(FIXED_TRIPLE)));
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let e = engine();
        let a = e.reconcile(
            &mixed_batch(),
            &flamengo_quotes(),
            at(1, 20),
            &mut StdRng::seed_from_u64(11),
        );
        let b = e.reconcile(
            &mixed_batch(),
            &flamengo_quotes(),
            at(1, 20),
            &mut StdRng::seed_from_u64(11),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_ordering_ties_broken_by_id() {
        let fixtures = vec![
            fixture(30, "TIMED", at(4, 20), "A", "B"),
            fixture(10, "TIMED", at(4, 20), "C", "D"),
            fixture(20, "TIMED", at(3, 20), "E", "F"),
            fixture(31, "FINISHED", at(1, 20), "G", "H"),
            fixture(11, "FINISHED", at(1, 20), "I", "J"),
            fixture(21, "FINISHED", at(2, 20), "K", "L"),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let out = engine().reconcile(&fixtures, &[], at(2, 23), &mut rng);
        let ids = |b: &[ReconciledFixture]| b.iter().map(|f| f.fixture.id).collect::<Vec<_>>();
        assert_eq!(ids(&out.document.upcoming), vec![20, 10, 30]);
        assert_eq!(ids(&out.document.finished), vec![21, 11, 31]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let fixtures = vec![
            fixture(1, "FINISHED", at(1, 16), "Botafogo", "Fluminense"),
            fixture(1, "SCHEDULED", at(1, 16), "Botafogo", "Fluminense"),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let out = engine().reconcile(&fixtures, &[], at(1, 20), &mut rng);
        assert_eq!(out.document.len(), 1);
        assert_eq!(out.document.finished.len(), 1);
        assert_eq!(out.stats.duplicates_dropped, 1);
    }

    #[test]
    fn test_empty_batch_without_demo_gives_empty_document() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = engine().reconcile(&[], &[], at(1, 20), &mut rng);
        assert!(out.document.is_empty());
        assert_eq!(out.document.generated_at, at(1, 20));
        assert!(!out.stats.demo);
    }

    #[test]
    fn test_empty_batch_with_demo_substitutes_tagged_fixtures() {
        let e = engine().with_demo_fixtures(true);
        let mut rng = StdRng::seed_from_u64(1);
        let out = e.reconcile(&[], &[], at(1, 20), &mut rng);
        let doc = &out.document;

        assert!(doc.demo);
        assert!(out.stats.demo);
        assert_eq!(doc.upcoming.len(), 3);
        assert!(doc.upcoming.iter().all(|f| f.demo));
        assert!(doc
            .upcoming
            .iter()
            .all(|f| f.fixture.competition_code == DEMO_COMPETITION_CODE));
        assert!(doc.upcoming.iter().all(|f| f.price.unwrap().is_valid()));
        assert_eq!(doc.upcoming[0].fixture.kickoff, at(2, 19));
    }

    #[test]
    fn test_demo_not_used_when_fixtures_present() {
        let e = engine().with_demo_fixtures(true);
        let mut rng = StdRng::seed_from_u64(1);
        let out = e.reconcile(&mixed_batch(), &[], at(1, 20), &mut rng);
        assert!(!out.document.demo);
        assert!(out.document.iter().all(|f| !f.demo));
    }
}
