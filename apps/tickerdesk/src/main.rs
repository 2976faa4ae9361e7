//! Tickerdesk Binary
//!
//! Runs one watchlist client against the machine-shared store and bus.
//! Start several processes with the same data directory to watch the
//! ledgers and prices converge across them.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tickerdesk
//! ```
//!
//! # Environment Variables
//!
//! All optional:
//! - `TICKERDESK_IDENTITY`: Identity to log in as (default: last login on this machine)
//! - `TICKERDESK_WATCH`: Comma-separated symbols to watch after login
//! - `TICKERDESK_SYMBOLS`: Comma-separated symbol catalog (default: GOOG,TSLA,AMZN,META,NVDA)
//! - `TICKERDESK_TICK_MS`: Simulation tick period in milliseconds (default: 1000)
//! - `TICKERDESK_DRIFT_PCT`: Largest per-tick price move in percent (default: 1.0)
//! - `TICKERDESK_PRICE_DECIMALS`: Decimal places for prices (default: 2)
//! - `TICKERDESK_DATA_DIR`: Store directory (default: .tickerdesk)
//! - `TICKERDESK_BUS_CAPACITY`: Bus buffer per receiver (default: 1024)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use tickerdesk::infrastructure::telemetry;
use tickerdesk::{
    Client, ClientConfig, ClientId, DeskConfig, DeskSnapshot, FileStore, ProcessBus,
    RandomWalkModel, Symbol, ToggleOutcome,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    telemetry::init();

    tracing::info!("Starting Tickerdesk");

    let config = DeskConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("could not open the store at {}", config.data_dir.display()))?;
    let bus = Arc::new(ProcessBus::new(config.bus_capacity));
    let model = Arc::new(RandomWalkModel::new(
        config.simulation.drift_pct,
        config.simulation.price_decimals,
    ));

    let handle = Client::spawn(
        ClientConfig {
            client_id: ClientId::generate(),
            catalog: config.catalog.clone(),
            tick_period: config.simulation.tick_period,
        },
        Arc::new(store),
        bus,
        model,
        shutdown_token.clone(),
    );

    let identity = match config.identity.clone() {
        Some(identity) => identity,
        None => handle.last_identity().await?.context(
            "no TICKERDESK_IDENTITY set and no stored last login; set TICKERDESK_IDENTITY",
        )?,
    };

    tracing::info!(%identity, "Logging in");
    let first = handle.login(identity).await?;
    render(&first);

    // make sure every requested symbol ends up watched, whatever the
    // stored ledger already holds
    let mut watched = first.watchlist.clone();
    for raw in &config.watch {
        let symbol = Symbol::new(raw);
        if watched.contains(&symbol) {
            continue;
        }
        match handle.toggle(raw).await? {
            ToggleOutcome::Added => watched.push(symbol),
            ToggleOutcome::Removed => watched.retain(|s| *s != symbol),
            ToggleOutcome::Unrecognized => {
                tracing::warn!(symbol = raw.as_str(), "requested symbol is not in the catalog");
            }
        }
    }

    // mirror every state change into the log
    let mut updates = handle.updates();
    let render_token = shutdown_token.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = render_token.cancelled() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    render(&snapshot);
                }
            }
        }
    });

    tracing::info!("Desk ready");

    await_shutdown(shutdown_token).await;

    let _ = handle.shutdown().await;

    tracing::info!("Desk stopped");
    Ok(())
}

/// Log the desk view the way the dashboard would draw it.
fn render(snapshot: &DeskSnapshot) {
    if snapshot.watchlist.is_empty() {
        tracing::info!("watching nothing");
        return;
    }
    for symbol in &snapshot.watchlist {
        match snapshot.prices.iter().find(|view| view.symbol == *symbol) {
            Some(view) => tracing::info!(
                symbol = %view.symbol,
                price = %view.price,
                origin = %view.origin,
                "quote"
            ),
            None => tracing::info!(symbol = %symbol, "quote pending"),
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &DeskConfig) {
    tracing::info!(
        symbols = config.catalog.len(),
        tick_period = ?config.simulation.tick_period,
        drift_pct = config.simulation.drift_pct,
        data_dir = %config.data_dir.display(),
        bus_capacity = config.bus_capacity,
        "Configuration loaded"
    );
}

/// Load a .env file from the current directory or any ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
