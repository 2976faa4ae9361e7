//! Symbol Types
//!
//! Ticker symbols and the configured set this desk recognizes. The set is
//! configuration, not data: membership gates every input boundary (toggles,
//! incoming broadcasts, driver ticks), so nothing outside the catalog ever
//! reaches the ledger or the price register.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Symbol
// =============================================================================

/// A ticker symbol, held ASCII-uppercase.
///
/// Construction only normalizes; recognition is the catalog's job
/// ([`SymbolCatalog::resolve`]).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol, trimming whitespace and uppercasing.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    /// The symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(Self::new(&s))
    }
}

// =============================================================================
// Symbol Catalog
// =============================================================================

/// Symbols the reference desk ships with.
pub const DEFAULT_SYMBOLS: [&str; 5] = ["GOOG", "TSLA", "AMZN", "META", "NVDA"];

/// The configured, closed set of recognized symbols, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCatalog {
    symbols: Vec<Symbol>,
}

impl SymbolCatalog {
    /// Build a catalog, keeping first-seen order and dropping duplicates
    /// and empty entries.
    #[must_use]
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols = Vec::new();
        for entry in raw {
            let symbol = Symbol::new(entry.as_ref());
            if !symbol.as_str().is_empty() && !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        Self { symbols }
    }

    /// Normalize `raw` and return it as a catalog symbol, if recognized.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<Symbol> {
        let symbol = Symbol::new(raw);
        self.symbols.contains(&symbol).then_some(symbol)
    }

    /// Whether `symbol` is in the catalog.
    #[must_use]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// The catalog in display order.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Number of recognized symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the catalog recognizes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_SYMBOLS)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_new_trims_and_uppercases() {
        assert_eq!(Symbol::new(" goog ").as_str(), "GOOG");
        assert_eq!(Symbol::new("NvDa").as_str(), "NVDA");
    }

    #[test]
    fn symbol_serde_is_a_plain_string() {
        let json = serde_json::to_string(&Symbol::new("TSLA")).unwrap();
        assert_eq!(json, "\"TSLA\"");

        let back: Symbol = serde_json::from_str("\"tsla\"").unwrap();
        assert_eq!(back.as_str(), "TSLA");
    }

    #[test]
    fn default_catalog_matches_the_reference_set_in_order() {
        let catalog = SymbolCatalog::default();
        let names: Vec<&str> = catalog.symbols().iter().map(Symbol::as_str).collect();
        assert_eq!(names, ["GOOG", "TSLA", "AMZN", "META", "NVDA"]);
    }

    #[test]
    fn catalog_drops_duplicates_and_blanks() {
        let catalog = SymbolCatalog::new(["GOOG", "goog", "", "  ", "TSLA"]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn resolve_normalizes_and_gates() {
        let catalog = SymbolCatalog::default();
        assert_eq!(catalog.resolve("goog"), Some(Symbol::new("GOOG")));
        assert_eq!(catalog.resolve(" tsla "), Some(Symbol::new("TSLA")));
        assert_eq!(catalog.resolve("AAPL"), None);
    }
}
