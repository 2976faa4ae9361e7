//! Application Layer - Session logic and the client event loop.
//!
//! The session core applies domain rules to commands, bus messages, and
//! simulation ticks; the client actor drives it from a single task behind
//! the storage and bus ports declared here.

/// Abstract interfaces to storage, the broadcast bus, and the price model.
pub mod ports;

/// The per-client synchronization state machine.
pub mod session;

/// The client actor and its command handle.
pub mod client;
