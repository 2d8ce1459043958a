// storefront/src/main.rs

mod config;
mod db;
mod errors;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::state::{AppState, Backends};

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  // LOG_FORMAT=json switches to one JSON object per line.
  if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
    builder.json().init();
  } else {
    builder.init();
  }
}

async fn build_state(config: Arc<AppConfig>) -> AppResult<AppState> {
  let pool = db::connect(&config).await?;
  if config.apply_schema {
    db::apply_schema(&pool).await?;
  }
  let gateway = services::build_gateway(&config)?;
  Ok(AppState::new(config, Backends::postgres(pool, gateway)))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  init_tracing();
  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let app_state = match build_state(app_config.clone()).await {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise application state.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
