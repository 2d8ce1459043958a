// storefront/src/db/mod.rs

//! PostgreSQL implementations of the core storage ports, using runtime queries.

pub mod carts;
pub mod orders;
pub mod products;

pub use carts::PgCartStore;
pub use orders::PgOrderStore;
pub use products::PgPriceCatalog;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use storefront_core::CheckoutError;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::Result;

const SCHEMA: &str = include_str!("../../schema.sql");

pub async fn connect(config: &AppConfig) -> Result<PgPool> {
  let pool = PgPoolOptions::new()
    .max_connections(config.db_max_connections)
    .connect(&config.database_url)
    .await?;
  info!(max_connections = config.db_max_connections, "Successfully connected to the database.");
  Ok(pool)
}

pub async fn apply_schema(pool: &PgPool) -> Result<()> {
  sqlx::raw_sql(SCHEMA).execute(pool).await?;
  info!("Database schema applied.");
  Ok(())
}

/// Unique violations become `Conflict`; everything else is an opaque storage failure.
pub(crate) fn map_sqlx(context: &'static str, err: sqlx::Error) -> CheckoutError {
  if let sqlx::Error::Database(db_err) = &err {
    if db_err.is_unique_violation() {
      return CheckoutError::Conflict(format!("{}: {}", context, db_err.message()));
    }
  }
  error!(error = %err, "{} failed.", context);
  CheckoutError::storage(anyhow::Error::new(err).context(context))
}
