//! Course Platform - video courses unlocked by promo codes
//!
//! Architecture:
//! - SeaORM for database access (SQLite by default)
//! - Axum for the HTTP API with rate limiting
//! - In-memory bearer sessions for credential login
//! - Tokio for async runtime

// sea-orm's json column derives expand to `serde_json::` paths
extern crate json as serde_json;

mod entity;
mod error;
mod plugins;
mod prelude;
mod state;
mod sv;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  plugins::{cron, server},
  prelude::*,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "courses=debug,tower_http=debug,axum=trace,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  info!("Starting Course Platform v{}", env!("CARGO_PKG_VERSION"));

  let config = Config::from_env()?;
  if config.admins.is_empty() {
    warn!("ADMIN_EMAILS not set, nobody can author courses");
  }

  let app = Arc::new(AppState::new(config).await?);

  plugins::App::new()
    .register(server::Plugin)
    .register(cron::SessionGc)
    .run(app)
    .await;

  Ok(())
}
