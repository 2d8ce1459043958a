// storefront-core/src/order.rs

//! The order record and the types that describe its lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CheckoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Placed,
  Paid,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Placed => "PLACED",
      OrderStatus::Paid => "PAID",
      OrderStatus::Shipped => "SHIPPED",
      OrderStatus::Delivered => "DELIVERED",
      OrderStatus::Cancelled => "CANCELLED",
    }
  }

  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Placed,
    OrderStatus::Paid,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  /// Fulfillment transitions accepted through `OrderLedger::update_status`.
  /// Re-applying the current status is always allowed. Nothing moves to PAID
  /// here: only a verified payment does that.
  pub fn can_transition_to(&self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    *self == next
      || matches!(
        (self, next),
        (Placed, Cancelled) | (Paid, Shipped) | (Paid, Cancelled) | (Shipped, Delivered)
      )
  }

  /// Every status `next` may be reached from through `can_transition_to`.
  pub fn allowed_predecessors(next: OrderStatus) -> Vec<OrderStatus> {
    Self::ALL.into_iter().filter(|s| s.can_transition_to(next)).collect()
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = CheckoutError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "PLACED" => Ok(OrderStatus::Placed),
      "PAID" => Ok(OrderStatus::Paid),
      "SHIPPED" => Ok(OrderStatus::Shipped),
      "DELIVERED" => Ok(OrderStatus::Delivered),
      "CANCELLED" => Ok(OrderStatus::Cancelled),
      other => Err(CheckoutError::Validation(format!("Unknown order status '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
}

impl PaymentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "PENDING",
      PaymentStatus::Completed => "COMPLETED",
      PaymentStatus::Failed => "FAILED",
    }
  }
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentStatus {
  type Err = CheckoutError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "PENDING" => Ok(PaymentStatus::Pending),
      "COMPLETED" => Ok(PaymentStatus::Completed),
      "FAILED" => Ok(PaymentStatus::Failed),
      other => Err(CheckoutError::Validation(format!("Unknown payment status '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
  #[serde(alias = "productRef")]
  pub product: String,
  pub quantity: u32,
}

impl LineItem {
  pub fn new(product: impl Into<String>, quantity: u32) -> Self {
    Self {
      product: product.into(),
      quantity,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  /// Empty only for legacy rows awaiting `OrderLedger::backfill_missing_order_ids`.
  pub order_id: String,
  pub user_id: String,
  pub items: Vec<LineItem>,
  pub amount: Decimal,
  pub address: String,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub payment_provider_order_ref: Option<String>,
  pub payment_id: Option<String>,
  pub paid_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn summary(&self) -> OrderSummary {
    OrderSummary {
      id: self.id,
      order_id: self.order_id.clone(),
      amount: self.amount,
      status: self.status,
      payment_status: self.payment_status,
      payment_id: self.payment_id.clone(),
    }
  }

  pub fn is_paid(&self) -> bool {
    self.payment_status == PaymentStatus::Completed
  }
}

/// Input to `OrderLedger::create`. `order_id` is normally left empty and generated.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
  pub order_id: Option<String>,
  pub user_id: String,
  pub items: Vec<LineItem>,
  pub amount: Decimal,
  pub address: String,
}

impl OrderDraft {
  pub fn new(user_id: impl Into<String>, items: Vec<LineItem>, amount: Decimal, address: impl Into<String>) -> Self {
    Self {
      order_id: None,
      user_id: user_id.into(),
      items,
      amount,
      address: address.into(),
    }
  }

  pub(crate) fn validate(&self) -> Result<(), CheckoutError> {
    if self.user_id.trim().is_empty() {
      return Err(CheckoutError::Validation("userId is required".to_string()));
    }
    if self.address.trim().is_empty() {
      return Err(CheckoutError::Validation("address is required".to_string()));
    }
    if self.items.is_empty() {
      return Err(CheckoutError::Validation("at least one item is required".to_string()));
    }
    if let Some(item) = self
      .items
      .iter()
      .find(|i| i.product.trim().is_empty() || i.quantity == 0)
    {
      return Err(CheckoutError::Validation(format!(
        "invalid item '{}' x {}",
        item.product, item.quantity
      )));
    }
    if self.amount.is_sign_negative() {
      return Err(CheckoutError::Validation("amount must not be negative".to_string()));
    }
    Ok(())
  }

  pub(crate) fn into_order(self, order_id: String, now: DateTime<Utc>) -> Order {
    Order {
      id: Uuid::new_v4(),
      order_id,
      user_id: self.user_id,
      items: self.items,
      amount: self.amount,
      address: self.address,
      status: OrderStatus::Placed,
      payment_status: PaymentStatus::Pending,
      payment_provider_order_ref: None,
      payment_id: None,
      paid_at: None,
      created_at: now,
      updated_at: now,
    }
  }
}

/// Fulfillment update accepted by `OrderLedger::update_status`.
///
/// Payment fields are not part of it; they change only through
/// `OrderLedger::record_payment`. Unknown fields such as `paymentStatus` are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatusUpdate {
  pub status: OrderStatus,
}

impl StatusUpdate {
  pub fn new(status: OrderStatus) -> Self {
    Self { status }
  }
}

/// Client-facing view of an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
  pub id: Uuid,
  pub order_id: String,
  pub amount: Decimal,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_id: Option<String>,
}
