//! Infrastructure Layer - Adapters behind the application ports.
//!
//! Everything that touches the OS lives here: the file-backed store, the
//! in-process broadcast bus, the random-walk price model, environment
//! configuration, and log output.

/// Key-value storage adapters.
pub mod store;

/// The in-process broadcast bus.
pub mod bus;

/// The simulated price process.
pub mod simulation;

/// Environment-driven configuration.
pub mod config;

/// Structured logging setup.
pub mod telemetry;
