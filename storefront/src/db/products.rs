// storefront/src/db/products.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use storefront_core::{CheckoutResult, PriceLookup};

use super::map_sqlx;

/// Reads current offer prices from the `products` table.
#[derive(Clone)]
pub struct PgPriceCatalog {
  pool: PgPool,
}

impl PgPriceCatalog {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl PriceLookup for PgPriceCatalog {
  async fn unit_price(&self, product: &str) -> CheckoutResult<Option<Decimal>> {
    sqlx::query_scalar::<_, Decimal>("SELECT offer_price FROM products WHERE id = $1")
      .bind(product)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| map_sqlx("price lookup", e))
  }
}
