//! Client Actor
//!
//! One client is one Tokio task owning a [`SessionCore`]. The task
//! multiplexes commands from [`ClientHandle`]s, messages from the bus,
//! simulation ticks, and cancellation. The simulation driver is an
//! interval owned by the loop: starting it means creating the interval,
//! stopping it means dropping it, so a stopped driver cannot leave a
//! pending timer behind.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::ports::{BroadcastBus, BusEvents, KeyValueStore, PriceModel};
use crate::application::session::{DeskSnapshot, NoSession, SessionCore, ToggleOutcome};
use crate::domain::identity::{ClientId, Identity};
use crate::domain::message::BusMessage;
use crate::domain::symbol::SymbolCatalog;

/// Command backlog bound. Handles await each reply, so traffic is
/// effectively serial and the bound only matters under handle churn.
const COMMAND_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// Errors
// =============================================================================

/// Why a handle call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The command needs an active session and there is none.
    #[error("no active session")]
    NoSession,

    /// The client task is gone; the handle is permanently dead.
    #[error("client task is no longer running")]
    Closed,
}

impl From<NoSession> for ClientError {
    fn from(NoSession: NoSession) -> Self {
        Self::NoSession
    }
}

// =============================================================================
// Commands
// =============================================================================

enum ClientCommand {
    Login {
        identity: Identity,
        reply: oneshot::Sender<DeskSnapshot>,
    },
    Logout {
        reply: oneshot::Sender<()>,
    },
    Toggle {
        symbol: String,
        reply: oneshot::Sender<Result<ToggleOutcome, ClientError>>,
    },
    Snapshot {
        reply: oneshot::Sender<DeskSnapshot>,
    },
    LastIdentity {
        reply: oneshot::Sender<Option<Identity>>,
    },
    ClearLastIdentity {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// =============================================================================
// Client
// =============================================================================

/// Construction parameters for one client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// This client's id, stamped on every price it produces.
    pub client_id: ClientId,
    /// The symbols the desk understands.
    pub catalog: SymbolCatalog,
    /// Time between simulation ticks while the driver runs.
    pub tick_period: Duration,
}

/// The client task state. Constructed through [`Client::spawn`].
pub struct Client {
    core: SessionCore,
    bus: Arc<dyn BroadcastBus>,
    updates: watch::Sender<DeskSnapshot>,
    tick_period: Duration,
    cancel: CancellationToken,
}

impl Client {
    /// Spawn the client task and return the handle for talking to it.
    ///
    /// The task stops when `cancel` fires, when [`ClientHandle::shutdown`]
    /// is called, or when the last handle is dropped.
    pub fn spawn(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn BroadcastBus>,
        model: Arc<dyn PriceModel>,
        cancel: CancellationToken,
    ) -> ClientHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (updates_tx, updates_rx) = watch::channel(DeskSnapshot::default());
        let events = bus.attach(config.client_id.clone());

        let client = Self {
            core: SessionCore::new(config.client_id, config.catalog, store, model),
            bus,
            updates: updates_tx,
            tick_period: config.tick_period,
            cancel,
        };
        tokio::spawn(client.run(commands_rx, events));

        ClientHandle {
            commands: commands_tx,
            updates: updates_rx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<ClientCommand>,
        mut events: Box<dyn BusEvents>,
    ) {
        debug!(client_id = %self.core.client_id(), "client task started");
        let cancel = self.cancel.clone();
        let mut ticker: Option<Interval> = None;
        let mut bus_open = true;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("client task cancelled");
                    break;
                }
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle_command(command, &mut ticker).is_break() {
                                break;
                            }
                        }
                        // every handle is gone; nobody can reach this client
                        None => break,
                    }
                }
                message = events.recv(), if bus_open => {
                    match message {
                        Some(message) => self.handle_message(message, &mut ticker),
                        None => {
                            warn!("broadcast bus closed, continuing local-only");
                            bus_open = false;
                        }
                    }
                }
                _ = next_tick(&mut ticker) => {
                    self.handle_tick();
                }
            }
        }
        debug!(client_id = %self.core.client_id(), "client task stopped");
    }

    fn handle_command(
        &mut self,
        command: ClientCommand,
        ticker: &mut Option<Interval>,
    ) -> ControlFlow<()> {
        match command {
            ClientCommand::Login { identity, reply } => {
                info!(%identity, "session started");
                self.core.login(identity);
                self.reconcile_driver(ticker);
                self.push_snapshot();
                let _ = reply.send(self.core.snapshot());
            }
            ClientCommand::Logout { reply } => {
                info!("session ended");
                self.core.logout();
                self.reconcile_driver(ticker);
                self.push_snapshot();
                let _ = reply.send(());
            }
            ClientCommand::Toggle { symbol, reply } => match self.core.toggle(&symbol) {
                Ok(effect) => {
                    if let Some(message) = effect.publish {
                        self.bus.publish(self.core.client_id(), &message);
                        self.reconcile_driver(ticker);
                        self.push_snapshot();
                    }
                    let _ = reply.send(Ok(effect.outcome));
                }
                Err(error) => {
                    let _ = reply.send(Err(error.into()));
                }
            },
            ClientCommand::Snapshot { reply } => {
                let _ = reply.send(self.core.snapshot());
            }
            ClientCommand::LastIdentity { reply } => {
                let _ = reply.send(self.core.last_identity());
            }
            ClientCommand::ClearLastIdentity { reply } => {
                self.core.clear_last_identity();
                let _ = reply.send(());
            }
            ClientCommand::Shutdown { reply } => {
                debug!("shutdown requested");
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_message(&mut self, message: BusMessage, ticker: &mut Option<Interval>) {
        if self.core.on_message(message) {
            self.reconcile_driver(ticker);
            self.push_snapshot();
        }
    }

    fn handle_tick(&mut self) {
        let broadcasts = self.core.tick();
        if broadcasts.is_empty() {
            return;
        }
        for message in &broadcasts {
            self.bus.publish(self.core.client_id(), message);
        }
        self.push_snapshot();
    }

    /// Bring the driver in line with the session: an interval exists
    /// exactly while a session with a non-empty ledger is active.
    fn reconcile_driver(&self, ticker: &mut Option<Interval>) {
        if self.core.driver_should_run() {
            if ticker.is_none() {
                let mut interval =
                    time::interval_at(Instant::now() + self.tick_period, self.tick_period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                *ticker = Some(interval);
                debug!(period = ?self.tick_period, "simulation driver running");
            }
        } else if ticker.take().is_some() {
            debug!("simulation driver stopped");
        }
    }

    fn push_snapshot(&self) {
        self.updates.send_replace(self.core.snapshot());
    }
}

/// The driver's next tick; pends forever while the driver is stopped.
async fn next_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable handle to one client task.
#[derive(Clone)]
pub struct ClientHandle {
    commands: mpsc::Sender<ClientCommand>,
    updates: watch::Receiver<DeskSnapshot>,
}

impl ClientHandle {
    /// Start a session for `identity` and return the first view.
    pub async fn login(&self, identity: Identity) -> Result<DeskSnapshot, ClientError> {
        self.request(|reply| ClientCommand::Login { identity, reply })
            .await
    }

    /// End the session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.request(|reply| ClientCommand::Logout { reply }).await
    }

    /// Flip a symbol's membership in the active ledger.
    pub async fn toggle(&self, symbol: &str) -> Result<ToggleOutcome, ClientError> {
        let symbol = symbol.to_owned();
        self.request(|reply| ClientCommand::Toggle { symbol, reply })
            .await?
    }

    /// The current view of the desk.
    pub async fn snapshot(&self) -> Result<DeskSnapshot, ClientError> {
        self.request(|reply| ClientCommand::Snapshot { reply }).await
    }

    /// The identity that last logged in on this machine, if recorded.
    pub async fn last_identity(&self) -> Result<Option<Identity>, ClientError> {
        self.request(|reply| ClientCommand::LastIdentity { reply })
            .await
    }

    /// Forget the last-login hint.
    pub async fn clear_last_identity(&self) -> Result<(), ClientError> {
        self.request(|reply| ClientCommand::ClearLastIdentity { reply })
            .await
    }

    /// Stop the client task, waiting for it to acknowledge.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.request(|reply| ClientCommand::Shutdown { reply }).await
    }

    /// A receiver that always holds the latest desk snapshot.
    #[must_use]
    pub fn updates(&self) -> watch::Receiver<DeskSnapshot> {
        self.updates.clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ClientCommand,
    ) -> Result<T, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| ClientError::Closed)?;
        reply_rx.await.map_err(|_| ClientError::Closed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::infrastructure::bus::ProcessBus;
    use crate::infrastructure::simulation::RandomWalkModel;
    use crate::infrastructure::store::MemoryStore;

    fn spawn_client(tick_period: Duration) -> (ClientHandle, CancellationToken) {
        let cancel = CancellationToken::new();
        let handle = Client::spawn(
            ClientConfig {
                client_id: ClientId::generate(),
                catalog: SymbolCatalog::default(),
                tick_period,
            },
            Arc::new(MemoryStore::default()),
            Arc::new(ProcessBus::default()),
            Arc::new(RandomWalkModel::default()),
            cancel.clone(),
        );
        (handle, cancel)
    }

    #[tokio::test]
    async fn toggle_without_a_session_is_rejected() {
        let (handle, _cancel) = spawn_client(Duration::from_secs(1));
        assert_eq!(handle.toggle("GOOG").await, Err(ClientError::NoSession));
    }

    #[tokio::test]
    async fn login_toggle_snapshot_flow() {
        let (handle, _cancel) = spawn_client(Duration::from_secs(3_600));

        let first = handle.login(Identity::new("u@x.com")).await.unwrap();
        assert_eq!(first.identity, Some(Identity::new("u@x.com")));
        assert_eq!(first.prices.len(), 5);

        assert_eq!(handle.toggle("goog").await.unwrap(), ToggleOutcome::Added);
        assert_eq!(
            handle.toggle("AAPL").await.unwrap(),
            ToggleOutcome::Unrecognized
        );
        assert_eq!(handle.toggle("GOOG").await.unwrap(), ToggleOutcome::Removed);

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.watchlist.is_empty());

        assert_eq!(
            handle.last_identity().await.unwrap(),
            Some(Identity::new("u@x.com"))
        );
        handle.clear_last_identity().await.unwrap();
        assert_eq!(handle.last_identity().await.unwrap(), None);
    }

    #[tokio::test]
    async fn shutdown_closes_the_handle() {
        let (handle, _cancel) = spawn_client(Duration::from_secs(1));
        handle.shutdown().await.unwrap();
        assert_eq!(handle.snapshot().await, Err(ClientError::Closed));
    }

    #[tokio::test]
    async fn cancellation_stops_the_task() {
        let (handle, cancel) = spawn_client(Duration::from_secs(1));
        cancel.cancel();
        loop {
            match handle.snapshot().await {
                Err(ClientError::Closed) => break,
                Ok(_) => tokio::task::yield_now().await,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn driver_ticks_update_the_snapshot() {
        let (handle, _cancel) = spawn_client(Duration::from_millis(50));
        handle.login(Identity::new("u@x.com")).await.unwrap();
        handle.toggle("TSLA").await.unwrap();

        let mut updates = handle.updates();
        loop {
            updates.changed().await.unwrap();
            let ticked = updates.borrow_and_update().prices.iter().any(|view| {
                view.symbol.as_str() == "TSLA" && view.observed_at > DateTime::UNIX_EPOCH
            });
            if ticked {
                break;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn driver_stops_when_the_ledger_empties() {
        let (handle, _cancel) = spawn_client(Duration::from_millis(50));
        handle.login(Identity::new("u@x.com")).await.unwrap();
        handle.toggle("TSLA").await.unwrap();

        let mut updates = handle.updates();
        loop {
            updates.changed().await.unwrap();
            let ticked = updates
                .borrow_and_update()
                .prices
                .iter()
                .any(|view| view.observed_at > DateTime::UNIX_EPOCH);
            if ticked {
                break;
            }
        }

        handle.toggle("TSLA").await.unwrap();
        let quiet = handle.snapshot().await.unwrap();
        time::sleep(Duration::from_millis(500)).await;
        let later = handle.snapshot().await.unwrap();
        assert_eq!(quiet.prices, later.prices);
    }
}
