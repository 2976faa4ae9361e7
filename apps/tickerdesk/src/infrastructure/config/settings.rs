//! Desk Configuration Settings
//!
//! Configuration types for the desk, loaded from environment variables.
//! Every variable is optional; an unset or unparsable value falls back to
//! its default.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::identity::Identity;
use crate::domain::symbol::SymbolCatalog;
use crate::infrastructure::bus::DEFAULT_BUS_CAPACITY;
use crate::infrastructure::simulation::{DEFAULT_DRIFT_PCT, DEFAULT_PRICE_DECIMALS};

/// Store directory used when `TICKERDESK_DATA_DIR` is unset.
const DEFAULT_DATA_DIR: &str = ".tickerdesk";

/// Simulation driver settings.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Time between simulation ticks.
    pub tick_period: Duration,
    /// Largest single-step move, in percent.
    pub drift_pct: f64,
    /// Decimal places prices are rounded to.
    pub price_decimals: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            drift_pct: DEFAULT_DRIFT_PCT,
            price_decimals: DEFAULT_PRICE_DECIMALS,
        }
    }
}

/// Complete desk configuration.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// The symbols the desk understands.
    pub catalog: SymbolCatalog,
    /// Simulation driver settings.
    pub simulation: SimulationSettings,
    /// Directory for the shared key-value store.
    pub data_dir: PathBuf,
    /// Per-receiver buffer on the broadcast bus.
    pub bus_capacity: usize,
    /// Identity to log in as. When unset, the stored last login is used.
    pub identity: Option<Identity>,
    /// Symbols to watch right after login.
    pub watch: Vec<String>,
}

impl DeskConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when `TICKERDESK_SYMBOLS` is set but contains no
    /// usable symbol.
    pub fn from_env() -> Result<Self, ConfigError> {
        let catalog = match std::env::var("TICKERDESK_SYMBOLS") {
            Ok(raw) => {
                let catalog = SymbolCatalog::new(raw.split(','));
                if catalog.is_empty() {
                    return Err(ConfigError::EmptyValue("TICKERDESK_SYMBOLS".to_string()));
                }
                catalog
            }
            Err(_) => SymbolCatalog::default(),
        };

        let simulation = SimulationSettings {
            tick_period: parse_env_duration_millis(
                "TICKERDESK_TICK_MS",
                SimulationSettings::default().tick_period,
            ),
            drift_pct: parse_env_f64(
                "TICKERDESK_DRIFT_PCT",
                SimulationSettings::default().drift_pct,
            ),
            price_decimals: parse_env_u32(
                "TICKERDESK_PRICE_DECIMALS",
                SimulationSettings::default().price_decimals,
            ),
        };

        let data_dir = std::env::var("TICKERDESK_DATA_DIR")
            .map_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

        let bus_capacity = parse_env_usize("TICKERDESK_BUS_CAPACITY", DEFAULT_BUS_CAPACITY);

        let identity = std::env::var("TICKERDESK_IDENTITY")
            .ok()
            .map(|raw| Identity::new(&raw))
            .filter(|identity| !identity.as_str().is_empty());

        let watch = std::env::var("TICKERDESK_WATCH").map_or_else(
            |_| Vec::new(),
            |raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            },
        );

        Ok(Self {
            catalog,
            simulation,
            data_dir,
            bus_capacity,
            identity,
            watch,
        })
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            catalog: SymbolCatalog::default(),
            simulation: SimulationSettings::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            identity: None,
            watch: Vec::new(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable is set but holds no usable value.
    #[error("environment variable {0} holds no usable value")]
    EmptyValue(String),
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .map_or(default, |raw| parse_duration_millis(&raw, default))
}

// An interval cannot run on a zero period; treat it like any unparsable
// value.
fn parse_duration_millis(raw: &str, default: Duration) -> Duration {
    raw.parse::<u64>()
        .ok()
        .filter(|&ms| ms > 0)
        .map_or(default, Duration::from_millis)
}
