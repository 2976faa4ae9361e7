//! Subscription Ledger
//!
//! The ordered, duplicate-free set of symbols an identity is watching.
//! The whole list is the unit of persistence and replication: loads,
//! stores, and bus updates always carry the full value.

use serde::Serialize;

use crate::domain::symbol::{Symbol, SymbolCatalog};

/// An identity's watched symbols, in the order they were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Watchlist {
    symbols: Vec<Symbol>,
}

impl Watchlist {
    /// An empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            symbols: Vec::new(),
        }
    }

    /// Build a ledger from an incoming symbol sequence.
    ///
    /// Symbols outside the catalog and repeated entries are dropped; the
    /// first occurrence fixes the position. Replicas that share a catalog
    /// therefore normalize a received list identically.
    #[must_use]
    pub fn from_symbols<I>(symbols: I, catalog: &SymbolCatalog) -> Self
    where
        I: IntoIterator<Item = Symbol>,
    {
        let mut ledger = Self::new();
        for symbol in symbols {
            if catalog.contains(&symbol) && !ledger.symbols.contains(&symbol) {
                ledger.symbols.push(symbol);
            }
        }
        ledger
    }

    /// Decode a stored ledger value.
    ///
    /// The stored form is a JSON array of symbol strings. Entries are
    /// normalized and re-filtered against the catalog so a value written
    /// under an older catalog still loads.
    pub fn parse(bytes: &[u8], catalog: &SymbolCatalog) -> Result<Self, serde_json::Error> {
        let symbols: Vec<Symbol> = serde_json::from_slice(bytes)?;
        Ok(Self::from_symbols(symbols, catalog))
    }

    /// Encode the ledger for storage.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.symbols)
    }

    /// Flip a symbol's membership. Returns `true` when the symbol is
    /// present afterwards.
    ///
    /// A re-added symbol lands at the end, not at its old position.
    pub fn toggle(&mut self, symbol: Symbol) -> bool {
        if let Some(index) = self.symbols.iter().position(|s| *s == symbol) {
            self.symbols.remove(index);
            false
        } else {
            self.symbols.push(symbol);
            true
        }
    }

    /// Whether the symbol is currently watched.
    #[must_use]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// The watched symbols in insertion order.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Number of watched symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
