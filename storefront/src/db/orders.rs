// storefront/src/db/orders.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use storefront_core::{
  CheckoutError, CheckoutResult, LineItem, Order, OrderStatus, OrderStore, PaymentStatus,
};
use uuid::Uuid;

use super::map_sqlx;

const ORDER_COLUMNS: &str = "id, order_id, user_id, items, amount, address, status, payment_status, \
   payment_provider_order_ref, payment_id, paid_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  order_id: Option<String>,
  user_id: String,
  items: Json<Vec<LineItem>>,
  amount: Decimal,
  address: String,
  status: String,
  payment_status: String,
  payment_provider_order_ref: Option<String>,
  payment_id: Option<String>,
  paid_at: Option<DateTime<Utc>>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = CheckoutError;

  fn try_from(row: OrderRow) -> CheckoutResult<Self> {
    let status = row
      .status
      .parse::<OrderStatus>()
      .map_err(|_| CheckoutError::Integrity(format!("order {} has unknown status '{}'", row.id, row.status)))?;
    let payment_status = row.payment_status.parse::<PaymentStatus>().map_err(|_| {
      CheckoutError::Integrity(format!(
        "order {} has unknown payment status '{}'",
        row.id, row.payment_status
      ))
    })?;
    Ok(Order {
      id: row.id,
      order_id: row.order_id.unwrap_or_default(),
      user_id: row.user_id,
      items: row.items.0,
      amount: row.amount,
      address: row.address,
      status,
      payment_status,
      payment_provider_order_ref: row.payment_provider_order_ref,
      payment_id: row.payment_id,
      paid_at: row.paid_at,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

fn convert(row: Option<OrderRow>) -> CheckoutResult<Option<Order>> {
  row.map(Order::try_from).transpose()
}

fn empty_to_null(order_id: &str) -> Option<&str> {
  if order_id.trim().is_empty() {
    None
  } else {
    Some(order_id)
  }
}

#[derive(Clone)]
pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn fetch_one_where(&self, clause: &str, value: &str) -> CheckoutResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE {} = $1 LIMIT 1", ORDER_COLUMNS, clause);
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(value)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| map_sqlx("order lookup", e))?;
    convert(row)
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  async fn insert(&self, order: Order) -> CheckoutResult<Order> {
    let sql = format!(
      "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {}",
      ORDER_COLUMNS, ORDER_COLUMNS
    );
    let row: OrderRow = sqlx::query_as(&sql)
      .bind(order.id)
      .bind(empty_to_null(&order.order_id))
      .bind(&order.user_id)
      .bind(Json(&order.items))
      .bind(order.amount)
      .bind(&order.address)
      .bind(order.status.as_str())
      .bind(order.payment_status.as_str())
      .bind(order.payment_provider_order_ref.as_deref())
      .bind(order.payment_id.as_deref())
      .bind(order.paid_at)
      .bind(order.created_at)
      .bind(order.updated_at)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| map_sqlx("order insert", e))?;
    Order::try_from(row)
  }

  async fn insert_many(&self, orders: Vec<Order>) -> CheckoutResult<Vec<Order>> {
    if orders.is_empty() {
      return Ok(orders);
    }
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("INSERT INTO orders ({}) ", ORDER_COLUMNS));
    builder.push_values(&orders, |mut b, order| {
      b.push_bind(order.id)
        .push_bind(empty_to_null(&order.order_id))
        .push_bind(&order.user_id)
        .push_bind(Json(&order.items))
        .push_bind(order.amount)
        .push_bind(&order.address)
        .push_bind(order.status.as_str())
        .push_bind(order.payment_status.as_str())
        .push_bind(order.payment_provider_order_ref.as_deref())
        .push_bind(order.payment_id.as_deref())
        .push_bind(order.paid_at)
        .push_bind(order.created_at)
        .push_bind(order.updated_at);
    });
    builder.push(format!(" RETURNING {}", ORDER_COLUMNS));

    // One statement, so the batch is all-or-nothing.
    let rows: Vec<OrderRow> = builder
      .build_query_as()
      .fetch_all(&self.pool)
      .await
      .map_err(|e| map_sqlx("order batch insert", e))?;
    rows.into_iter().map(Order::try_from).collect()
  }

  async fn find_by_id(&self, id: Uuid) -> CheckoutResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| map_sqlx("order lookup", e))?;
    convert(row)
  }

  async fn find_by_order_id(&self, order_id: &str) -> CheckoutResult<Option<Order>> {
    self.fetch_one_where("order_id", order_id).await
  }

  async fn find_by_provider_ref(&self, provider_ref: &str) -> CheckoutResult<Option<Order>> {
    self.fetch_one_where("payment_provider_order_ref", provider_ref).await
  }

  async fn transition_status(
    &self,
    order_id: &str,
    allowed_from: &[OrderStatus],
    next: OrderStatus,
    now: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>> {
    // The status guard runs inside the UPDATE so concurrent writers cannot both pass it.
    let sql = format!(
      "UPDATE orders SET status = $3, updated_at = $4 WHERE order_id = $1 AND status = ANY($2) RETURNING {}",
      ORDER_COLUMNS
    );
    let from: Vec<String> = allowed_from.iter().map(|s| s.as_str().to_string()).collect();
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(order_id)
      .bind(from)
      .bind(next.as_str())
      .bind(now)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| map_sqlx("order status update", e))?;
    convert(row)
  }

  async fn set_provider_ref(
    &self,
    order_id: &str,
    provider_ref: &str,
    now: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>> {
    let sql = format!(
      "UPDATE orders SET payment_provider_order_ref = $2, updated_at = $3 WHERE order_id = $1 RETURNING {}",
      ORDER_COLUMNS
    );
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(order_id)
      .bind(provider_ref)
      .bind(now)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| map_sqlx("provider reference update", e))?;
    convert(row)
  }

  async fn mark_paid(
    &self,
    provider_ref: &str,
    payment_id: &str,
    paid_at: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>> {
    // Only the first verification of a PLACED order moves the row.
    let sql = format!(
      "UPDATE orders SET status = 'PAID', payment_status = 'COMPLETED', payment_id = $2, paid_at = $3, \
       updated_at = $3 WHERE payment_provider_order_ref = $1 AND status = 'PLACED' AND payment_status <> 'COMPLETED' \
       RETURNING {}",
      ORDER_COLUMNS
    );
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(provider_ref)
      .bind(payment_id)
      .bind(paid_at)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| map_sqlx("payment recording", e))?;
    match row {
      Some(row) => Order::try_from(row).map(Some),
      None => self.find_by_provider_ref(provider_ref).await,
    }
  }

  async fn find_missing_order_ids(&self) -> CheckoutResult<Vec<Order>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE order_id IS NULL OR order_id = '' ORDER BY created_at ASC",
      ORDER_COLUMNS
    );
    let rows: Vec<OrderRow> = sqlx::query_as(&sql)
      .fetch_all(&self.pool)
      .await
      .map_err(|e| map_sqlx("legacy order scan", e))?;
    rows.into_iter().map(Order::try_from).collect()
  }

  async fn assign_order_id(&self, id: Uuid, order_id: &str) -> CheckoutResult<bool> {
    let result = sqlx::query(
      "UPDATE orders SET order_id = $2, updated_at = NOW() WHERE id = $1 AND (order_id IS NULL OR order_id = '')",
    )
    .bind(id)
    .bind(order_id)
    .execute(&self.pool)
    .await
    .map_err(|e| map_sqlx("order id backfill", e))?;
    Ok(result.rows_affected() > 0)
  }

  async fn delete(&self, order_id: &str) -> CheckoutResult<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
      .bind(order_id)
      .execute(&self.pool)
      .await
      .map_err(|e| map_sqlx("order delete", e))?;
    Ok(result.rows_affected() > 0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  fn row(order_id: Option<&str>, status: &str) -> OrderRow {
    let now = Utc::now();
    OrderRow {
      id: Uuid::new_v4(),
      order_id: order_id.map(str::to_string),
      user_id: "user_1".to_string(),
      items: Json(vec![LineItem::new("P1", 2)]),
      amount: dec!(102),
      address: "221B Baker St".to_string(),
      status: status.to_string(),
      payment_status: "PENDING".to_string(),
      payment_provider_order_ref: None,
      payment_id: None,
      paid_at: None,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn test_row_conversion() {
    let order = Order::try_from(row(Some("ORD-1-abc"), "PLACED")).unwrap();
    assert_eq!(order.order_id, "ORD-1-abc");
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items, vec![LineItem::new("P1", 2)]);
  }

  #[test]
  fn test_null_order_id_becomes_empty() {
    let order = Order::try_from(row(None, "PLACED")).unwrap();
    assert!(order.order_id.is_empty());
    assert_eq!(empty_to_null(""), None);
    assert_eq!(empty_to_null("ORD-1"), Some("ORD-1"));
  }

  #[test]
  fn test_unknown_status_is_integrity_error() {
    let err = Order::try_from(row(Some("ORD-1"), "LOST")).unwrap_err();
    assert!(matches!(err, CheckoutError::Integrity(_)));
  }
}
