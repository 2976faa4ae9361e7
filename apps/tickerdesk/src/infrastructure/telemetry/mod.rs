//! Tracing Setup
//!
//! Structured log output for the desk. `RUST_LOG` overrides the default
//! filter, which keeps the crate at info and everything else quiet.
//!
//! # Usage
//!
//! ```ignore
//! use tickerdesk::infrastructure::telemetry;
//!
//! // Initialize once at startup
//! telemetry::init();
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter applied when `RUST_LOG` does not override it.
const DEFAULT_DIRECTIVE: &str = "tickerdesk=info";

/// Initialize the global tracing subscriber.
///
/// Must be called at most once per process; tests leave it uncalled and
/// run without a subscriber.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env().add_directive(
        DEFAULT_DIRECTIVE
            .parse()
            .expect("static directive 'tickerdesk=info' is valid"),
    );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
