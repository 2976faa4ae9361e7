//! Domain Layer - Core synchronization types and merge logic.
//!
//! Pure types with serialization support and no I/O: symbols and the
//! configured recognition set, identities, the subscription ledger, the
//! convergent price register, and the bus wire schema.

/// Ticker symbols and the configured recognition set.
pub mod symbol;

/// Account identities and per-client instance ids.
pub mod identity;

/// The per-identity subscription ledger.
pub mod watchlist;

/// The convergent last-writer-wins price register.
pub mod register;

/// Bus wire messages.
pub mod message;
