//! Ports
//!
//! Trait seams between the session logic and the outside world. The
//! infrastructure layer provides the adapters; tests swap in in-memory
//! stand-ins.

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::identity::{ClientId, Identity};
use crate::domain::message::BusMessage;
use crate::domain::symbol::Symbol;

// =============================================================================
// Key-Value Store
// =============================================================================

/// The keys the desk keeps in its store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// An identity's full subscription ledger.
    Subscriptions(Identity),
    /// The identity that last logged in on this machine.
    LastIdentity,
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscriptions(identity) => write!(f, "subscriptions:{identity}"),
            Self::LastIdentity => f.write_str("last-identity"),
        }
    }
}

/// Shared durable storage, keyed by [`StoreKey`].
///
/// Writes replace the whole value. The surface is infallible: adapters log
/// failures and degrade (a failed read behaves as an absent key) so the
/// session never stops over storage trouble.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `None` for absent keys and for unreadable values.
    fn get(&self, key: &StoreKey) -> Option<Vec<u8>>;

    /// Write a value, replacing any previous one.
    fn put(&self, key: &StoreKey, value: &[u8]);

    /// Delete a value. Deleting an absent key is a no-op.
    fn remove(&self, key: &StoreKey);
}

// =============================================================================
// Broadcast Bus
// =============================================================================

/// A client's receive side of the bus. Dropping it unsubscribes.
#[async_trait]
pub trait BusEvents: Send {
    /// The next message from another client. `None` once the bus is gone
    /// for good.
    async fn recv(&mut self) -> Option<BusMessage>;
}

/// The unordered, at-most-once fan-out between clients on this machine.
///
/// Delivery excludes the sender. Publishing is fire-and-forget: with no
/// peers attached, or with the bus unavailable, messages vanish and each
/// client simply keeps its local state.
pub trait BroadcastBus: Send + Sync {
    /// Send a message to every other attached client.
    fn publish(&self, origin: &ClientId, message: &BusMessage);

    /// Attach a client and get its receive side. `own` filters the
    /// client's echoes of its own messages.
    fn attach(&self, own: ClientId) -> Box<dyn BusEvents>;
}

// =============================================================================
// Price Model
// =============================================================================

/// The price process the simulation driver samples.
pub trait PriceModel: Send + Sync {
    /// A starting price for a symbol with no prior observation.
    fn seed(&self, symbol: &Symbol) -> Decimal;

    /// The next price after `previous`.
    fn step(&self, symbol: &Symbol, previous: Decimal) -> Decimal;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_keys_render_their_namespace() {
        let key = StoreKey::Subscriptions(Identity::new("u@x.com"));
        assert_eq!(key.to_string(), "subscriptions:u@x.com");
        assert_eq!(StoreKey::LastIdentity.to_string(), "last-identity");
    }
}
