//! Folkvang boss tracker server
//!
//! Usage: `folkvang-server [config.ron]`
//!
//! `PORT`, `ADMIN_TOKEN` and `SECRET_KEY` in the environment override the
//! file. `RUST_LOG` or `DEBUG_LOGGING` control verbosity.

use folkvang_server::{logging, server, AppState, Config};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    logging::init();

    let config_path = std::env::args().nth(1);
    let config = match Config::from_sources(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if config.uses_default_admin_token() {
        warn!("ADMIN_TOKEN not set, using the development default");
    }
    if config.uses_default_secret_key() {
        warn!("SECRET_KEY not set, using the development default");
    }

    let app = Arc::new(AppState::new(config));
    app.store.initialize();
    info!(port = app.config.port, "starting folkvang server");

    tokio::select! {
        result = server::run(app) => {
            if let Err(e) = result {
                error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }
}
