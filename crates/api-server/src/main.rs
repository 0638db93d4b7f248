//! plangate HTTP gateway
//!
//! Accepts compiled query plans over HTTP, hands them to the external
//! datastore and compiler scripts, and relays their answers.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use command_runner::ProcessRunner;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Exit status when required configuration is missing or invalid
const CONFIG_EXIT_CODE: i32 = 9;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "plangate_server=debug,plangate_core=debug,command_runner=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(CONFIG_EXIT_CODE);
        }
    };

    tracing::info!("Writing plan sources to {:?}", config.artifact_dir);
    tracing::info!("Using datastore {:?}", config.datastore.script);

    let app_state = AppState::new(&config, Arc::new(ProcessRunner));

    if let Err(e) = app_state.gateway().artifacts().ensure_dir().await {
        tracing::error!("Cannot prepare artifact directory: {}", e);
        std::process::exit(1);
    }

    // Ids must be seeded before the first submission can arrive.
    app_state.gateway().reseed().await;

    let app = routes::router()
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on {}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
