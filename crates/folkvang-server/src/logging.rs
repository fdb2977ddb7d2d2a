//! Logging setup
//!
//! Stdout only. `RUST_LOG` takes precedence; otherwise INFO+ for everything,
//! or DEBUG for the folkvang crates when `DEBUG_LOGGING` is set.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Install the global subscriber. Call once, at startup.
pub fn init() {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug_logging)));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(filter)
        .init();

    tracing::info!(debug_logging, "folkvang logging initialized");
}

fn default_directive(debug_logging: bool) -> &'static str {
    if debug_logging {
        "info,folkvang_server=debug,folkvang_core=debug"
    } else {
        "info"
    }
}
