//! `ChatPulse` Hub -- presence and message-delivery synchronization server.
//!
//! An axum WebSocket server that maps chat identities to live connections,
//! tracks per-user presence, and fans out message delivery-status
//! transitions to conversation and personal rooms.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:9100
//! cargo run --bin chatpulse-hub
//!
//! # Run on custom address
//! cargo run --bin chatpulse-hub -- --bind 127.0.0.1:8080
//!
//! # Or via environment variable
//! CHATPULSE_ADDR=127.0.0.1:8080 cargo run --bin chatpulse-hub
//! ```

use std::sync::Arc;

use chatpulse_hub::config::{HubCliArgs, HubConfig};
use chatpulse_hub::hub::{self, HubState};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = HubCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match HubConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting chatpulse hub");

    let state = Arc::new(HubState::with_config(config.max_body_bytes));

    match hub::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "hub listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "hub server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start hub server");
            std::process::exit(1);
        }
    }
}
