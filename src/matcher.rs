//! Pairs a fixture with its most plausible odds feed quote.
//!
//! The feeds share no identifier, so a quote is accepted only when it kicks
//! off on the same UTC day and both team names are close enough on average.

use crate::model::{Bookmaker, PriceTriple, RawPriceQuote};
use crate::similarity;
use chrono::{DateTime, Utc};
use tracing::debug;

pub const DEFAULT_THRESHOLD: f64 = 0.60;

#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// A candidate is accepted only if its combined score is strictly above
    /// this value.
    pub threshold: f64,
    /// Bookmaker key or title to take prices from when the quote offers it.
    pub preferred_bookmaker: Option<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            preferred_bookmaker: None,
        }
    }
}

/// A real price taken from a matched quote.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPrice {
    pub price: PriceTriple,
    pub bookmaker: String,
    pub score: f64,
    pub quote_id: String,
}

#[derive(Debug, Clone)]
pub struct PriceMatcher {
    config: MatcherConfig,
}

impl PriceMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Best same-day quote for the fixture and its extracted prices.
    ///
    /// `None` means the caller must fall back to a synthetic price: either no
    /// candidate cleared the threshold or the winning quote had no usable
    /// head-to-head prices.
    pub fn match_fixture(
        &self,
        home: &str,
        away: &str,
        kickoff: DateTime<Utc>,
        quotes: &[RawPriceQuote],
    ) -> Option<MatchedPrice> {
        if quotes.is_empty() {
            return None;
        }

        let (quote, score) = self.best_candidate(home, away, kickoff, quotes)?;

        let Some(bookmaker) = self.select_bookmaker(quote) else {
            debug!(home, away, quote = %quote.id, "matched quote has no bookmakers");
            return None;
        };

        match extract_prices(quote, bookmaker) {
            Some(price) => {
                debug!(
                    home,
                    away,
                    quote = %quote.id,
                    bookmaker = bookmaker.label(),
                    score,
                    "matched"
                );
                Some(MatchedPrice {
                    price,
                    bookmaker: bookmaker.label().to_string(),
                    score,
                    quote_id: quote.id.clone(),
                })
            }
            None => {
                debug!(
                    home,
                    away,
                    quote = %quote.id,
                    bookmaker = bookmaker.label(),
                    "price extraction failed"
                );
                None
            }
        }
    }

    /// Highest combined score among same-day quotes. Ties keep the earlier
    /// quote, so the result depends only on input order.
    fn best_candidate<'q>(
        &self,
        home: &str,
        away: &str,
        kickoff: DateTime<Utc>,
        quotes: &'q [RawPriceQuote],
    ) -> Option<(&'q RawPriceQuote, f64)> {
        let day = kickoff.date_naive();
        let mut best: Option<(&RawPriceQuote, f64)> = None;

        for quote in quotes.iter().filter(|q| q.commence_time.date_naive() == day) {
            let combined = (similarity::score(home, &quote.home_team)
                + similarity::score(away, &quote.away_team))
                / 2.0;

            match best {
                Some((_, best_score)) if combined <= best_score => {}
                _ => best = Some((quote, combined)),
            }
        }

        best.filter(|&(_, s)| s > self.config.threshold)
    }

    fn select_bookmaker<'q>(&self, quote: &'q RawPriceQuote) -> Option<&'q Bookmaker> {
        if let Some(preferred) = self.config.preferred_bookmaker.as_deref() {
            let found = quote.bookmakers.iter().find(|b| {
                b.key.eq_ignore_ascii_case(preferred) || b.title.eq_ignore_ascii_case(preferred)
            });
            if found.is_some() {
                return found;
            }
        }
        quote.bookmakers.first()
    }
}

/// Head-to-head prices from one bookmaker. Outcomes are named after the
/// quote's own team names plus the literal "Draw".
fn extract_prices(quote: &RawPriceQuote, bookmaker: &Bookmaker) -> Option<PriceTriple> {
    let market = bookmaker.h2h()?;
    PriceTriple::checked(
        market.price_of(&quote.home_team)?,
        market.price_of("Draw")?,
        market.price_of(&quote.away_team)?,
    )
}
