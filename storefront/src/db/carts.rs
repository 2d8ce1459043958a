// storefront/src/db/carts.rs

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use storefront_core::{CartStore, CheckoutResult};

use super::map_sqlx;

#[derive(Clone)]
pub struct PgCartStore {
  pool: PgPool,
}

impl PgCartStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl CartStore for PgCartStore {
  async fn get(&self, user_id: &str) -> CheckoutResult<Value> {
    let cart: Option<Json<Value>> = sqlx::query_scalar("SELECT cart_data FROM carts WHERE user_id = $1")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| map_sqlx("cart lookup", e))?;
    Ok(cart.map(|c| c.0).unwrap_or_else(|| json!({})))
  }

  async fn replace(&self, user_id: &str, cart: Value) -> CheckoutResult<()> {
    sqlx::query(
      "INSERT INTO carts (user_id, cart_data, updated_at) VALUES ($1, $2, NOW()) \
       ON CONFLICT (user_id) DO UPDATE SET cart_data = EXCLUDED.cart_data, updated_at = NOW()",
    )
    .bind(user_id)
    .bind(Json(cart))
    .execute(&self.pool)
    .await
    .map_err(|e| map_sqlx("cart update", e))?;
    Ok(())
  }

  async fn clear(&self, user_id: &str) -> CheckoutResult<()> {
    self.replace(user_id, json!({})).await
  }
}
