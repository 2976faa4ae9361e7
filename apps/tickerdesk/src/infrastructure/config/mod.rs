//! Configuration Management
//!
//! Environment-driven settings for the desk.

mod settings;

pub use settings::{ConfigError, DeskConfig, SimulationSettings};
