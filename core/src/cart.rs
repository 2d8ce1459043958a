// storefront-core/src/cart.rs

//! Per-user cart storage. Cart contents are opaque JSON owned by the client.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::CheckoutResult;

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn get(&self, user_id: &str) -> CheckoutResult<Value>;

  async fn replace(&self, user_id: &str, cart: Value) -> CheckoutResult<()>;

  /// Empties the cart. Clearing an unknown or already empty cart succeeds.
  async fn clear(&self, user_id: &str) -> CheckoutResult<()>;
}

fn empty_cart() -> Value {
  Value::Object(Default::default())
}

#[derive(Default, Clone)]
pub struct MemoryCartStore {
  carts: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryCartStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl CartStore for MemoryCartStore {
  async fn get(&self, user_id: &str) -> CheckoutResult<Value> {
    Ok(self.carts.read().await.get(user_id).cloned().unwrap_or_else(empty_cart))
  }

  async fn replace(&self, user_id: &str, cart: Value) -> CheckoutResult<()> {
    self.carts.write().await.insert(user_id.to_string(), cart);
    Ok(())
  }

  async fn clear(&self, user_id: &str) -> CheckoutResult<()> {
    self.carts.write().await.insert(user_id.to_string(), empty_cart());
    Ok(())
  }
}
