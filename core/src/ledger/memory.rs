// storefront-core/src/ledger/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CheckoutError, CheckoutResult};
use crate::ledger::OrderStore;
use crate::order::{Order, OrderStatus, PaymentStatus};

#[derive(Default)]
struct Tables {
  orders: HashMap<Uuid, Order>,
  /// Unique index over non-empty order ids.
  by_order_id: HashMap<String, Uuid>,
}

impl Tables {
  fn check_unique(&self, order: &Order) -> CheckoutResult<()> {
    if !order.order_id.is_empty() && self.by_order_id.contains_key(&order.order_id) {
      return Err(CheckoutError::Conflict(format!("orderId {} already exists", order.order_id)));
    }
    Ok(())
  }

  fn put(&mut self, order: Order) {
    if !order.order_id.is_empty() {
      self.by_order_id.insert(order.order_id.clone(), order.id);
    }
    self.orders.insert(order.id, order);
  }

  fn by_order_id_mut(&mut self, order_id: &str) -> Option<&mut Order> {
    let id = *self.by_order_id.get(order_id)?;
    self.orders.get_mut(&id)
  }
}

/// A thread-safe in-memory order store.
///
/// Every mutation happens under one write lock, which gives the same
/// atomicity the PostgreSQL store gets from conditional updates. Used by tests
/// and by the app when no database is configured.
#[derive(Default, Clone)]
pub struct MemoryOrderStore {
  tables: Arc<RwLock<Tables>>,
}

impl MemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn len(&self) -> usize {
    self.tables.read().await.orders.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.len().await == 0
  }

  pub async fn all(&self) -> Vec<Order> {
    let mut orders: Vec<Order> = self.tables.read().await.orders.values().cloned().collect();
    orders.sort_by_key(|o| o.created_at);
    orders
  }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
  async fn insert(&self, order: Order) -> CheckoutResult<Order> {
    let mut tables = self.tables.write().await;
    tables.check_unique(&order)?;
    tables.put(order.clone());
    Ok(order)
  }

  async fn insert_many(&self, orders: Vec<Order>) -> CheckoutResult<Vec<Order>> {
    let mut tables = self.tables.write().await;
    let mut seen = std::collections::HashSet::new();
    for order in &orders {
      tables.check_unique(order)?;
      if !order.order_id.is_empty() && !seen.insert(order.order_id.as_str()) {
        return Err(CheckoutError::Conflict(format!(
          "orderId {} repeated within batch",
          order.order_id
        )));
      }
    }
    for order in &orders {
      tables.put(order.clone());
    }
    Ok(orders)
  }

  async fn find_by_id(&self, id: Uuid) -> CheckoutResult<Option<Order>> {
    Ok(self.tables.read().await.orders.get(&id).cloned())
  }

  async fn find_by_order_id(&self, order_id: &str) -> CheckoutResult<Option<Order>> {
    let tables = self.tables.read().await;
    Ok(
      tables
        .by_order_id
        .get(order_id)
        .and_then(|id| tables.orders.get(id))
        .cloned(),
    )
  }

  async fn find_by_provider_ref(&self, provider_ref: &str) -> CheckoutResult<Option<Order>> {
    let tables = self.tables.read().await;
    Ok(
      tables
        .orders
        .values()
        .find(|o| o.payment_provider_order_ref.as_deref() == Some(provider_ref))
        .cloned(),
    )
  }

  async fn transition_status(
    &self,
    order_id: &str,
    allowed_from: &[OrderStatus],
    next: OrderStatus,
    now: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>> {
    let mut tables = self.tables.write().await;
    Ok(
      tables
        .by_order_id_mut(order_id)
        .filter(|order| allowed_from.contains(&order.status))
        .map(|order| {
          order.status = next;
          order.updated_at = now;
          order.clone()
        }),
    )
  }

  async fn set_provider_ref(
    &self,
    order_id: &str,
    provider_ref: &str,
    now: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>> {
    let mut tables = self.tables.write().await;
    Ok(tables.by_order_id_mut(order_id).map(|order| {
      order.payment_provider_order_ref = Some(provider_ref.to_string());
      order.updated_at = now;
      order.clone()
    }))
  }

  async fn mark_paid(
    &self,
    provider_ref: &str,
    payment_id: &str,
    paid_at: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>> {
    let mut tables = self.tables.write().await;
    let Some(order) = tables
      .orders
      .values_mut()
      .find(|o| o.payment_provider_order_ref.as_deref() == Some(provider_ref))
    else {
      return Ok(None);
    };
    if order.status == OrderStatus::Placed && order.payment_status != PaymentStatus::Completed {
      order.status = OrderStatus::Paid;
      order.payment_status = PaymentStatus::Completed;
      order.payment_id = Some(payment_id.to_string());
      order.paid_at = Some(paid_at);
      order.updated_at = paid_at;
    }
    Ok(Some(order.clone()))
  }

  async fn find_missing_order_ids(&self) -> CheckoutResult<Vec<Order>> {
    let tables = self.tables.read().await;
    let mut legacy: Vec<Order> = tables
      .orders
      .values()
      .filter(|o| o.order_id.trim().is_empty())
      .cloned()
      .collect();
    legacy.sort_by_key(|o| o.created_at);
    Ok(legacy)
  }

  async fn assign_order_id(&self, id: Uuid, order_id: &str) -> CheckoutResult<bool> {
    let mut tables = self.tables.write().await;
    if tables.by_order_id.contains_key(order_id) {
      return Err(CheckoutError::Conflict(format!("orderId {} already exists", order_id)));
    }
    let assigned = match tables.orders.get_mut(&id) {
      Some(order) if order.order_id.trim().is_empty() => {
        order.order_id = order_id.to_string();
        true
      }
      _ => false,
    };
    if assigned {
      tables.by_order_id.insert(order_id.to_string(), id);
    }
    Ok(assigned)
  }

  async fn delete(&self, order_id: &str) -> CheckoutResult<bool> {
    let mut tables = self.tables.write().await;
    match tables.by_order_id.remove(order_id) {
      Some(id) => Ok(tables.orders.remove(&id).is_some()),
      None => Ok(false),
    }
  }
}
