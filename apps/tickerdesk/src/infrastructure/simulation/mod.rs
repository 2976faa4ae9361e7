//! Random-Walk Price Model
//!
//! The simulated price process. Seeds start near a familiar base per
//! symbol; each step moves the previous price by a bounded random
//! percentage and rounds to display precision.

use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::application::ports::PriceModel;
use crate::domain::symbol::Symbol;

/// Largest single-step move, as a percentage of the previous price.
pub const DEFAULT_DRIFT_PCT: f64 = 1.0;

/// Decimal places prices are rounded to.
pub const DEFAULT_PRICE_DECIMALS: u32 = 2;

/// Starting neighborhoods for the well-known symbols.
const BASE_PRICES: [(&str, i64); 5] = [
    ("GOOG", 135),
    ("TSLA", 260),
    ("AMZN", 100),
    ("META", 240),
    ("NVDA", 380),
];

/// Base for symbols without a listed neighborhood.
const FALLBACK_BASE: i64 = 100;

/// A bounded random walk in percentage space.
#[derive(Debug, Clone)]
pub struct RandomWalkModel {
    drift_pct: f64,
    decimals: u32,
}

impl RandomWalkModel {
    /// A walk moving at most `drift_pct` percent per step, rounded to
    /// `decimals` places.
    #[must_use]
    pub fn new(drift_pct: f64, decimals: u32) -> Self {
        Self {
            drift_pct: drift_pct.abs(),
            decimals,
        }
    }
}

impl Default for RandomWalkModel {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_PCT, DEFAULT_PRICE_DECIMALS)
    }
}

impl PriceModel for RandomWalkModel {
    fn seed(&self, symbol: &Symbol) -> Decimal {
        let base = BASE_PRICES
            .iter()
            .find(|(name, _)| *name == symbol.as_str())
            .map_or(FALLBACK_BASE, |(_, base)| *base);
        Decimal::from(base + rand::rng().random_range(-5..=5))
    }

    fn step(&self, _symbol: &Symbol, previous: Decimal) -> Decimal {
        let pct = rand::rng().random_range(-self.drift_pct..=self.drift_pct);
        let factor = Decimal::from_f64_retain(1.0 + pct / 100.0).unwrap_or(Decimal::ONE);
        (previous * factor)
            .round_dp_with_strategy(self.decimals, RoundingStrategy::MidpointAwayFromZero)
    }
}

// =============================================================================
// Tests
// =============================================================================
