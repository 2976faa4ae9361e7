//! Session Core
//!
//! The per-client synchronization state machine. One instance is owned by
//! one client task; commands, bus messages, and simulation ticks all flow
//! through `&mut self`, so every rule here is single-threaded and the
//! concurrency story stays in the client actor.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::ports::{KeyValueStore, PriceModel, StoreKey};
use crate::domain::identity::{ClientId, Identity};
use crate::domain::message::BusMessage;
use crate::domain::register::{MergeOutcome, PricePoint, PriceRegister};
use crate::domain::symbol::{Symbol, SymbolCatalog};
use crate::domain::watchlist::Watchlist;

// =============================================================================
// Monotonic Clock
// =============================================================================

/// A wall clock that never repeats or steps backwards.
///
/// Tick timestamps drive the register's merge rule, so two observations
/// from the same client must never carry the same instant. When the OS
/// clock stalls or jumps back, the next stamp is the previous one plus a
/// microsecond.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Option<DateTime<Utc>>,
}

impl MonotonicClock {
    /// The next timestamp, strictly after every earlier one.
    pub fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamped = self.last.map_or(now, |last| {
            last.checked_add_signed(TimeDelta::microseconds(1))
                .map_or(now, |floor| now.max(floor))
        });
        self.last = Some(stamped);
        stamped
    }
}

// =============================================================================
// Session Types
// =============================================================================

/// What a toggle request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The symbol is now watched.
    Added,
    /// The symbol is no longer watched.
    Removed,
    /// The symbol is not in the catalog; nothing changed.
    Unrecognized,
}

/// A command that needs an active session arrived without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no active session")]
pub struct NoSession;

/// A toggle's local result plus the announcement to publish, if the
/// ledger changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleEffect {
    /// How the ledger changed.
    pub outcome: ToggleOutcome,
    /// The full-ledger announcement for the bus.
    pub publish: Option<BusMessage>,
}

/// One row of the price board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceView {
    /// The symbol.
    pub symbol: Symbol,
    /// The freshest known price.
    pub price: Decimal,
    /// When that price was observed.
    pub observed_at: DateTime<Utc>,
    /// The client that observed it.
    pub origin: ClientId,
}

/// A point-in-time view of the desk, published after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeskSnapshot {
    /// The logged-in identity, if any.
    pub identity: Option<Identity>,
    /// The active ledger in insertion order. Empty when logged out.
    pub watchlist: Vec<Symbol>,
    /// The price board, in catalog order.
    pub prices: Vec<PriceView>,
}

// =============================================================================
// Session Core
// =============================================================================

/// Session state and the rules that change it.
pub struct SessionCore {
    client_id: ClientId,
    catalog: SymbolCatalog,
    store: Arc<dyn KeyValueStore>,
    model: Arc<dyn PriceModel>,
    clock: MonotonicClock,
    identity: Option<Identity>,
    watchlist: Watchlist,
    register: PriceRegister,
}

impl SessionCore {
    /// A logged-out core over the given store and price model.
    pub fn new(
        client_id: ClientId,
        catalog: SymbolCatalog,
        store: Arc<dyn KeyValueStore>,
        model: Arc<dyn PriceModel>,
    ) -> Self {
        Self {
            client_id,
            catalog,
            store,
            model,
            clock: MonotonicClock::default(),
            identity: None,
            watchlist: Watchlist::new(),
            register: PriceRegister::new(),
        }
    }

    /// This client's id.
    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Start a session for `identity`.
    ///
    /// Loads the identity's ledger from the store, records the identity as
    /// the machine's last login, and seeds a starting price for every
    /// catalog symbol. Seeds are epoch-stamped, so prices already learned
    /// from the bus keep their place.
    pub fn login(&mut self, identity: Identity) {
        self.store
            .put(&StoreKey::LastIdentity, identity.as_str().as_bytes());
        self.watchlist = self.load_ledger(&identity);
        for symbol in self.catalog.symbols().to_vec() {
            let price = self.model.seed(&symbol);
            let seed = PricePoint::seed(symbol, price, self.client_id.clone());
            self.register.merge(seed);
        }
        self.identity = Some(identity);
    }

    /// End the session.
    ///
    /// Clears the in-memory ledger view and the price board. The stored
    /// ledger and the last-login hint stay put for the next login.
    pub fn logout(&mut self) {
        self.identity = None;
        self.watchlist = Watchlist::new();
        self.register.clear();
    }

    /// Flip a symbol's membership in the active ledger.
    ///
    /// The new full ledger is persisted before the announcement is handed
    /// back, so a peer that reacts to the announcement by reading the
    /// store sees the same value.
    pub fn toggle(&mut self, raw: &str) -> Result<ToggleEffect, NoSession> {
        let identity = self.identity.clone().ok_or(NoSession)?;
        let Some(symbol) = self.catalog.resolve(raw) else {
            debug!(symbol = raw, "ignoring toggle for a symbol outside the catalog");
            return Ok(ToggleEffect {
                outcome: ToggleOutcome::Unrecognized,
                publish: None,
            });
        };

        let outcome = if self.watchlist.toggle(symbol) {
            ToggleOutcome::Added
        } else {
            ToggleOutcome::Removed
        };
        self.persist_ledger(&identity);

        Ok(ToggleEffect {
            outcome,
            publish: Some(BusMessage::subscriptions_updated(&identity, &self.watchlist)),
        })
    }

    /// Apply a message received from the bus.
    ///
    /// Returns `true` when the visible state changed. Ledger updates for
    /// other identities are ignored; price broadcasts merge regardless of
    /// session state, because the register is machine-level knowledge.
    pub fn on_message(&mut self, message: BusMessage) -> bool {
        match message {
            BusMessage::SubscriptionsUpdated {
                identity,
                subscriptions,
            } => {
                if self.identity.as_ref() == Some(&identity) {
                    self.watchlist = Watchlist::from_symbols(subscriptions, &self.catalog);
                    true
                } else {
                    false
                }
            }
            BusMessage::PriceBroadcast {
                symbol,
                price,
                observed_at,
                origin_client_id,
            } => {
                if !self.catalog.contains(&symbol) {
                    debug!(%symbol, "dropping a price for a symbol outside the catalog");
                    return false;
                }
                let point = PricePoint {
                    symbol,
                    price,
                    observed_at,
                    origin: origin_client_id,
                };
                self.register.merge(point) == MergeOutcome::Applied
            }
            BusMessage::Unknown => false,
        }
    }

    /// Advance every watched symbol one simulation step.
    ///
    /// Each step starts from the register's current entry (whoever
    /// produced it), merges the new observation locally, and returns the
    /// broadcasts to publish. Without a session this is a no-op.
    pub fn tick(&mut self) -> Vec<BusMessage> {
        if self.identity.is_none() {
            return Vec::new();
        }

        let mut broadcasts = Vec::new();
        for symbol in self.watchlist.symbols().to_vec() {
            let previous = self
                .register
                .get(&symbol)
                .map_or_else(|| self.model.seed(&symbol), |point| point.price);
            let point = PricePoint {
                price: self.model.step(&symbol, previous),
                observed_at: self.clock.stamp(),
                origin: self.client_id.clone(),
                symbol,
            };
            self.register.merge(point.clone());
            broadcasts.push(BusMessage::price_broadcast(&point));
        }
        broadcasts
    }

    /// Whether the simulation driver should be running right now.
    #[must_use]
    pub fn driver_should_run(&self) -> bool {
        self.identity.is_some() && !self.watchlist.is_empty()
    }

    /// The current view of the desk.
    #[must_use]
    pub fn snapshot(&self) -> DeskSnapshot {
        let prices = self
            .catalog
            .symbols()
            .iter()
            .filter_map(|symbol| self.register.get(symbol))
            .map(|point| PriceView {
                symbol: point.symbol.clone(),
                price: point.price,
                observed_at: point.observed_at,
                origin: point.origin.clone(),
            })
            .collect();

        DeskSnapshot {
            identity: self.identity.clone(),
            watchlist: self.watchlist.symbols().to_vec(),
            prices,
        }
    }

    /// The identity that last logged in on this machine, if recorded.
    #[must_use]
    pub fn last_identity(&self) -> Option<Identity> {
        self.store
            .get(&StoreKey::LastIdentity)
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .map(|raw| Identity::new(&raw))
    }

    /// Forget the last-login hint.
    pub fn clear_last_identity(&self) {
        self.store.remove(&StoreKey::LastIdentity);
    }

    fn load_ledger(&self, identity: &Identity) -> Watchlist {
        let key = StoreKey::Subscriptions(identity.clone());
        let Some(bytes) = self.store.get(&key) else {
            return Watchlist::new();
        };
        match Watchlist::parse(&bytes, &self.catalog) {
            Ok(ledger) => ledger,
            Err(error) => {
                warn!(%identity, %error, "stored ledger is unreadable, starting empty");
                Watchlist::new()
            }
        }
    }

    fn persist_ledger(&self, identity: &Identity) {
        match self.watchlist.encode() {
            Ok(bytes) => self
                .store
                .put(&StoreKey::Subscriptions(identity.clone()), &bytes),
            Err(error) => warn!(%identity, %error, "could not encode ledger, skipping persist"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
