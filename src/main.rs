//! Quiz bank backend
//!
//! - Axum HTTP + WebSocket API for a multiple-choice quiz
//! - Per-browser question banks, lazily seeded from a default dataset
//! - Timed quiz sessions (countdown per question) with score history
//! - Static SPA fallback (`server.static_dir`, default ./static)
//!
//! Important env variables:
//!   QUIZ_CONFIG_PATH   : path to TOML config (see `config.rs`)
//!   PORT               : u16 (default 3000)
//!   QUIZ_DEFAULTS_URL  : fetch the default question dataset over HTTP
//!   QUIZ_DEFAULTS_PATH : read the default question dataset from disk
//!   QUIZ_STORE_PATH    : persist the document store to this JSON file
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod bank;
mod config;
mod defaults;
mod domain;
mod error;
mod identity;
mod logic;
mod protocol;
mod routes;
mod scores;
mod select;
mod session;
mod state;
mod store;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::load_app_config_from_env;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = load_app_config_from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

  // Shared state: document store, default questions source, identity cookie settings.
  let state = Arc::new(AppState::from_config(config).await?);

  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizbank", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quizbank", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "quizbank", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
  info!(target: "quizbank", "Shutdown requested");
}
