#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Tickerdesk - Multi-Client Watchlist Synchronization
//!
//! A synchronization core for a stock-watchlist desk. Any number of
//! client event loops share one persistent store and one broadcast bus;
//! clients logged in under the same identity converge on the same
//! subscription ledger and the same simulated price board without a
//! central server.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Synchronization types and merge rules
//!   - `symbol`: Ticker symbols and the supported-symbol catalog
//!   - `identity`: Account identities and client ids
//!   - `watchlist`: The full-value subscription ledger
//!   - `register`: The last-write-wins price register
//!   - `message`: The JSON bus message schema
//!
//! - **Application**: Session logic and port definitions
//!   - `ports`: Interfaces for storage, the bus, and the price model
//!   - `session`: The per-client state machine
//!   - `client`: The client actor and its command handle
//!
//! - **Infrastructure**: Adapters and process wiring
//!   - `store`: File-backed and in-memory key-value stores
//!   - `bus`: The in-process broadcast bus
//!   - `simulation`: The random-walk price model
//!   - `config`: Environment-driven configuration
//!   - `telemetry`: Structured log output
//!
//! # Data Flow
//!
//! ```text
//! Client A ──┐                         ┌── Client B
//!   ticks,   │    ┌───────────────┐    │   ticks,
//!   toggles  ├───►│ Broadcast Bus │◄───┤   toggles
//!            │    └───────────────┘    │
//!            │    ┌───────────────┐    │
//!            └───►│  Shared Store │◄───┘
//!                 └───────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Synchronization types with no external dependencies.
pub mod domain;

/// Application layer - Session logic and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and process wiring.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::identity::{ClientId, Identity};
pub use domain::message::BusMessage;
pub use domain::register::{MergeOutcome, PricePoint, PriceRegister};
pub use domain::symbol::{DEFAULT_SYMBOLS, Symbol, SymbolCatalog};
pub use domain::watchlist::Watchlist;

// Application ports and session types
pub use application::ports::{BroadcastBus, BusEvents, KeyValueStore, PriceModel, StoreKey};
pub use application::session::{
    DeskSnapshot, MonotonicClock, NoSession, PriceView, SessionCore, ToggleEffect, ToggleOutcome,
};

// Client actor (the crate's main entry point)
pub use application::client::{Client, ClientConfig, ClientError, ClientHandle};

// Infrastructure adapters (for the binary and integration tests)
pub use infrastructure::bus::ProcessBus;
pub use infrastructure::config::{ConfigError, DeskConfig, SimulationSettings};
pub use infrastructure::simulation::RandomWalkModel;
pub use infrastructure::store::{FileStore, MemoryStore};
