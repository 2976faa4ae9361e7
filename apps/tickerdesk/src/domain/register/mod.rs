//! Price Register
//!
//! A last-write-wins map from symbol to the freshest observed price.
//! Every client folds every observation (its own ticks and received
//! broadcasts) through [`PriceRegister::merge`]; because the merge rule is
//! a total order over `(observed_at, origin)`, replicas converge no matter
//! how the unordered bus interleaves delivery.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::identity::ClientId;
use crate::domain::symbol::Symbol;

// =============================================================================
// Price Point
// =============================================================================

/// One price observation for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePoint {
    /// The symbol the price belongs to.
    pub symbol: Symbol,
    /// The observed price.
    pub price: Decimal,
    /// When the originating client observed the price.
    pub observed_at: DateTime<Utc>,
    /// The client that produced the observation.
    pub origin: ClientId,
}

impl PricePoint {
    /// A board seed: a placeholder price stamped at the Unix epoch.
    ///
    /// The epoch timestamp makes seeds lose against any real observation,
    /// so seeding never overwrites replicated state.
    #[must_use]
    pub fn seed(symbol: Symbol, price: Decimal, origin: ClientId) -> Self {
        Self {
            symbol,
            price,
            observed_at: DateTime::UNIX_EPOCH,
            origin,
        }
    }

    /// Whether this observation beats `current` for the same symbol.
    ///
    /// Strictly newer wins; on an exact timestamp tie the byte-wise
    /// smaller origin id wins. Equal timestamp and equal origin keeps the
    /// incumbent, which makes replays no-ops.
    #[must_use]
    pub fn supersedes(&self, current: &Self) -> bool {
        match self.observed_at.cmp(&current.observed_at) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.origin < current.origin,
        }
    }
}

// =============================================================================
// Register
// =============================================================================

/// What a merge did with the offered point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The point is now the register's entry for its symbol.
    Applied,
    /// The register already held a winning entry; nothing changed.
    Stale,
}

/// The per-client price view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceRegister {
    entries: HashMap<Symbol, PricePoint>,
}

impl PriceRegister {
    /// An empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the register.
    pub fn merge(&mut self, point: PricePoint) -> MergeOutcome {
        match self.entries.entry(point.symbol.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(point);
                MergeOutcome::Applied
            }
            Entry::Occupied(mut slot) => {
                if point.supersedes(slot.get()) {
                    slot.insert(point);
                    MergeOutcome::Applied
                } else {
                    MergeOutcome::Stale
                }
            }
        }
    }

    /// The current entry for a symbol, if any.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&PricePoint> {
        self.entries.get(symbol)
    }

    /// All current entries, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.entries.values()
    }

    /// Number of symbols with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the register holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
