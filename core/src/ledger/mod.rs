// storefront-core/src/ledger/mod.rs

//! The order ledger: the only owner of persisted orders.
//!
//! `OrderStore` is the storage port (in-memory here, PostgreSQL in the app);
//! `OrderLedger` layers id generation, validation, collision retries and the
//! integrity checks on top of it.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{CheckoutError, CheckoutResult};
use crate::order::{Order, OrderDraft, OrderStatus, StatusUpdate};
use crate::order_id::{backfill_order_id, default_generator, OrderIdGenerator};

pub use memory::MemoryOrderStore;

/// Attempts made to insert under a freshly generated id before surfacing a conflict.
pub const DEFAULT_ID_ATTEMPTS: usize = 3;

/// Storage port for orders.
///
/// Implementations must enforce uniqueness of non-empty `order_id`s and report
/// a duplicate as `CheckoutError::Conflict`. Lookups return `Ok(None)` when
/// nothing matches; the ledger turns that into `NotFound`.
#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert(&self, order: Order) -> CheckoutResult<Order>;

  /// All-or-nothing batch insert.
  async fn insert_many(&self, orders: Vec<Order>) -> CheckoutResult<Vec<Order>>;

  async fn find_by_id(&self, id: Uuid) -> CheckoutResult<Option<Order>>;

  async fn find_by_order_id(&self, order_id: &str) -> CheckoutResult<Option<Order>>;

  async fn find_by_provider_ref(&self, provider_ref: &str) -> CheckoutResult<Option<Order>>;

  /// Sets `status` to `next` only while the current status is one of
  /// `allowed_from`, in a single conditional write. Returns `None` when no
  /// order matched, either because it does not exist or because its status
  /// was not allowed.
  async fn transition_status(
    &self,
    order_id: &str,
    allowed_from: &[OrderStatus],
    next: OrderStatus,
    now: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>>;

  async fn set_provider_ref(
    &self,
    order_id: &str,
    provider_ref: &str,
    now: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>>;

  /// Atomically moves the order correlated by `provider_ref` to PAID/COMPLETED,
  /// but only while it is PLACED and not yet COMPLETED. The current record is
  /// returned either way, so callers can tell an applied payment from one that
  /// was refused.
  async fn mark_paid(
    &self,
    provider_ref: &str,
    payment_id: &str,
    paid_at: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>>;

  /// Orders whose `order_id` is null or empty.
  async fn find_missing_order_ids(&self) -> CheckoutResult<Vec<Order>>;

  /// Sets `order_id` only if the record still lacks one. Returns whether it was set.
  async fn assign_order_id(&self, id: Uuid, order_id: &str) -> CheckoutResult<bool>;

  async fn delete(&self, order_id: &str) -> CheckoutResult<bool>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
  pub scanned: usize,
  pub repaired: usize,
  pub assigned: Vec<(Uuid, String)>,
}

#[derive(Clone)]
pub struct OrderLedger {
  store: Arc<dyn OrderStore>,
  id_generator: OrderIdGenerator,
  max_id_attempts: usize,
}

impl OrderLedger {
  pub fn new(store: Arc<dyn OrderStore>) -> Self {
    Self {
      store,
      id_generator: default_generator(),
      max_id_attempts: DEFAULT_ID_ATTEMPTS,
    }
  }

  pub fn with_id_generator(mut self, id_generator: OrderIdGenerator) -> Self {
    self.id_generator = id_generator;
    self
  }

  /// At least two attempts are always made.
  pub fn with_max_id_attempts(mut self, attempts: usize) -> Self {
    self.max_id_attempts = attempts.max(2);
    self
  }

  fn next_order_id(&self) -> CheckoutResult<String> {
    let order_id = (self.id_generator)();
    if order_id.trim().is_empty() {
      error!("Order id generator produced an empty id.");
      return Err(CheckoutError::Integrity(
        "order id generator produced an empty id".to_string(),
      ));
    }
    Ok(order_id)
  }

  fn ensure_intact(order: Order) -> CheckoutResult<Order> {
    if order.order_id.trim().is_empty() {
      error!(id = %order.id, "Order without orderId encountered; run the order id backfill.");
      return Err(CheckoutError::Integrity(format!(
        "order {} has no orderId",
        order.id
      )));
    }
    Ok(order)
  }

  #[instrument(name = "OrderLedger::create", skip(self, draft), fields(user_id = %draft.user_id), err(Display))]
  pub async fn create(&self, draft: OrderDraft) -> CheckoutResult<Order> {
    draft.validate()?;

    if let Some(order_id) = draft.order_id.clone() {
      if order_id.trim().is_empty() {
        return Err(CheckoutError::Validation("orderId must not be blank".to_string()));
      }
      return self.store.insert(draft.into_order(order_id, Utc::now())).await;
    }

    let mut attempt = 1;
    loop {
      let order_id = self.next_order_id()?;
      let order = draft.clone().into_order(order_id.clone(), Utc::now());
      match self.store.insert(order).await {
        Ok(stored) => {
          info!(order_id = %stored.order_id, id = %stored.id, amount = %stored.amount, "Order created.");
          return Ok(stored);
        }
        Err(CheckoutError::Conflict(msg)) if attempt < self.max_id_attempts => {
          warn!(%order_id, attempt, "orderId collision, regenerating: {}", msg);
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  /// Batch variant of `create`. Every draft is validated before anything is written.
  #[instrument(name = "OrderLedger::create_many", skip(self, drafts), fields(count = drafts.len()), err(Display))]
  pub async fn create_many(&self, drafts: Vec<OrderDraft>) -> CheckoutResult<Vec<Order>> {
    for draft in &drafts {
      draft.validate()?;
    }

    let mut attempt = 1;
    loop {
      let now = Utc::now();
      let mut batch = Vec::with_capacity(drafts.len());
      for draft in &drafts {
        let order_id = match draft.order_id.clone() {
          Some(explicit) if !explicit.trim().is_empty() => explicit,
          Some(_) => return Err(CheckoutError::Validation("orderId must not be blank".to_string())),
          None => self.next_order_id()?,
        };
        batch.push(draft.clone().into_order(order_id, now));
      }

      match self.store.insert_many(batch).await {
        Ok(stored) => {
          info!(count = stored.len(), "Order batch created.");
          return Ok(stored);
        }
        Err(CheckoutError::Conflict(msg)) if attempt < self.max_id_attempts => {
          warn!(attempt, "orderId collision in batch, regenerating: {}", msg);
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  pub async fn find_by_order_id(&self, order_id: &str) -> CheckoutResult<Order> {
    let order = self
      .store
      .find_by_order_id(order_id)
      .await?
      .ok_or_else(|| CheckoutError::NotFound(format!("order {}", order_id)))?;
    Self::ensure_intact(order)
  }

  pub async fn find_by_id(&self, id: Uuid) -> CheckoutResult<Order> {
    let order = self
      .store
      .find_by_id(id)
      .await?
      .ok_or_else(|| CheckoutError::NotFound(format!("order {}", id)))?;
    Self::ensure_intact(order)
  }

  pub async fn find_by_provider_ref(&self, provider_ref: &str) -> CheckoutResult<Order> {
    let order = self
      .store
      .find_by_provider_ref(provider_ref)
      .await?
      .ok_or_else(|| CheckoutError::NotFound(format!("order for payment order {}", provider_ref)))?;
    Self::ensure_intact(order)
  }

  /// Fulfillment update. Status changes must follow `OrderStatus::can_transition_to`;
  /// the check and the write happen together in the store.
  #[instrument(name = "OrderLedger::update_status", skip(self), err(Display))]
  pub async fn update_status(&self, order_id: &str, update: StatusUpdate) -> CheckoutResult<Order> {
    let next = update.status;
    let allowed_from = OrderStatus::allowed_predecessors(next);
    match self
      .store
      .transition_status(order_id, &allowed_from, next, Utc::now())
      .await?
    {
      Some(updated) => {
        debug!(%order_id, status = %updated.status, "Order status updated.");
        Self::ensure_intact(updated)
      }
      None => {
        let current = self.find_by_order_id(order_id).await?;
        Err(CheckoutError::Validation(format!(
          "cannot move order {} from {} to {}",
          order_id, current.status, next
        )))
      }
    }
  }

  pub async fn attach_provider_ref(&self, order_id: &str, provider_ref: &str) -> CheckoutResult<Order> {
    self
      .store
      .set_provider_ref(order_id, provider_ref, Utc::now())
      .await?
      .ok_or_else(|| CheckoutError::NotFound(format!("order {}", order_id)))
  }

  /// Idempotent PAID/COMPLETED transition keyed by the provider order reference.
  #[instrument(name = "OrderLedger::record_payment", skip(self), err(Display))]
  pub async fn record_payment(
    &self,
    provider_ref: &str,
    payment_id: &str,
    paid_at: DateTime<Utc>,
  ) -> CheckoutResult<Order> {
    let order = self
      .store
      .mark_paid(provider_ref, payment_id, paid_at)
      .await?
      .ok_or_else(|| CheckoutError::NotFound(format!("order for payment order {}", provider_ref)))?;
    if !order.is_paid() {
      warn!(order_id = %order.order_id, status = %order.status, "Payment refused for an order that is not awaiting one.");
      return Err(CheckoutError::Conflict(format!(
        "order {} is {} and cannot accept a payment",
        order.order_id, order.status
      )));
    }
    Self::ensure_intact(order)
  }

  /// Maintenance only; normal flow never deletes orders.
  pub async fn delete(&self, order_id: &str) -> CheckoutResult<()> {
    if self.store.delete(order_id).await? {
      warn!(%order_id, "Order deleted.");
      Ok(())
    } else {
      Err(CheckoutError::NotFound(format!("order {}", order_id)))
    }
  }

  /// Gives every order lacking an `orderId` a fresh one. Safe to run repeatedly.
  #[instrument(name = "OrderLedger::backfill_missing_order_ids", skip(self), err(Display))]
  pub async fn backfill_missing_order_ids(&self) -> CheckoutResult<BackfillReport> {
    let legacy = self.store.find_missing_order_ids().await?;
    let mut report = BackfillReport {
      scanned: legacy.len(),
      ..Default::default()
    };
    info!("Found {} orders without orderId.", legacy.len());

    for (index, order) in legacy.iter().enumerate() {
      let mut attempt = 1;
      loop {
        let candidate = backfill_order_id(order.created_at, index);
        match self.store.assign_order_id(order.id, &candidate).await {
          Ok(true) => {
            info!(id = %order.id, order_id = %candidate, "Order repaired.");
            report.repaired += 1;
            report.assigned.push((order.id, candidate));
            break;
          }
          Ok(false) => {
            debug!(id = %order.id, "Order already repaired elsewhere.");
            break;
          }
          Err(CheckoutError::Conflict(_)) if attempt < self.max_id_attempts => attempt += 1,
          Err(e) => return Err(e),
        }
      }
    }
    Ok(report)
  }
}
