//! Process Bus
//!
//! The broadcast bus for clients in one process. Messages cross the bus
//! as serialized JSON, so a client receives exactly what a cross-process
//! transport would deliver: unordered between publishers, at most once,
//! never echoed to the sender.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::application::ports::{BroadcastBus, BusEvents};
use crate::domain::identity::ClientId;
use crate::domain::message::BusMessage;

/// Default per-receiver buffer. A client further behind than this starts
/// losing the oldest messages, which the at-most-once contract allows.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct Envelope {
    origin: ClientId,
    payload: String,
}

/// Broadcast fan-out between the clients of one process.
#[derive(Debug, Clone)]
pub struct ProcessBus {
    sender: Option<broadcast::Sender<Envelope>>,
}

impl ProcessBus {
    /// A bus buffering up to `capacity` undelivered messages per receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Some(sender),
        }
    }

    /// A bus that drops every publish and delivers nothing. Clients on a
    /// disabled bus keep full local function, single-client style.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sender: None }
    }

    /// How many clients are currently attached.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for ProcessBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl BroadcastBus for ProcessBus {
    fn publish(&self, origin: &ClientId, message: &BusMessage) {
        let Some(sender) = &self.sender else {
            trace!("bus disabled, dropping outgoing message");
            return;
        };
        match serde_json::to_string(message) {
            Ok(payload) => {
                // a send error only means nobody is listening
                let _ = sender.send(Envelope {
                    origin: origin.clone(),
                    payload,
                });
            }
            Err(error) => warn!(%error, "could not encode outgoing message"),
        }
    }

    fn attach(&self, own: ClientId) -> Box<dyn BusEvents> {
        match &self.sender {
            Some(sender) => Box::new(ProcessBusEvents {
                own,
                receiver: sender.subscribe(),
            }),
            None => Box::new(DisabledBusEvents),
        }
    }
}

struct ProcessBusEvents {
    own: ClientId,
    receiver: broadcast::Receiver<Envelope>,
}

#[async_trait]
impl BusEvents for ProcessBusEvents {
    async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => {
                    if envelope.origin == self.own {
                        continue;
                    }
                    match serde_json::from_str(&envelope.payload) {
                        Ok(message) => return Some(message),
                        Err(error) => debug!(%error, "dropping an undecodable bus payload"),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "bus receiver lagged, messages lost");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

struct DisabledBusEvents;

#[async_trait]
impl BusEvents for DisabledBusEvents {
    async fn recv(&mut self) -> Option<BusMessage> {
        std::future::pending().await
    }
}

// =============================================================================
// Tests
// =============================================================================
