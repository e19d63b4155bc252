//! Synthetic prices for fixtures the odds feed could not be matched against.
//!
//! Every upcoming fixture in a snapshot carries a price; when no bookmaker
//! price is available one is made up here and tagged `synthetic`.

use crate::model::PriceTriple;
use rand::Rng;

/// Generic triple used by [`FallbackPolicy::Fixed`].
pub const FIXED_TRIPLE: PriceTriple = PriceTriple {
    home: 2.10,
    draw: 3.20,
    away: 3.50,
};

pub const DEFAULT_MARGIN: f64 = 0.91;

const HOME_PROB_RANGE: std::ops::Range<f64> = 0.30..0.70;
const DRAW_PROB: f64 = 0.25;
const AWAY_PROB_FLOOR: f64 = 0.10;
const MIN_PRICE: f64 = 1.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallbackPolicy {
    Fixed,
    /// Sample a home win probability, assume a flat draw probability and
    /// price all three outcomes with a bookmaker margin.
    Randomized { margin: f64 },
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        FallbackPolicy::Randomized {
            margin: DEFAULT_MARGIN,
        }
    }
}

impl FallbackPolicy {
    pub fn generate<R: Rng>(&self, rng: &mut R) -> PriceTriple {
        match *self {
            FallbackPolicy::Fixed => FIXED_TRIPLE,
            FallbackPolicy::Randomized { margin } => {
                let p_home = rng.gen_range(HOME_PROB_RANGE);
                randomized_triple(p_home, margin)
            }
        }
    }
}

/// Price a home win probability. The away probability is floored before
/// inversion and every price is clamped to at least `MIN_PRICE`, so the
/// triple stays valid at the ends of the sampling range.
fn randomized_triple(p_home: f64, margin: f64) -> PriceTriple {
    let p_away = (1.0 - p_home - DRAW_PROB).max(AWAY_PROB_FLOOR);

    PriceTriple {
        home: to_price(p_home, margin),
        draw: to_price(DRAW_PROB, margin),
        away: to_price(p_away, margin),
    }
}

fn to_price(probability: f64, margin: f64) -> f64 {
    let raw = margin / probability;
    let rounded = (raw * 100.0).round() / 100.0;
    if rounded.is_finite() {
        rounded.max(MIN_PRICE)
    } else {
        MIN_PRICE
    }
}
