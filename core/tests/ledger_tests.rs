// tests/ledger_tests.rs
mod common;

use chrono::{Duration, Utc};
use common::*;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use storefront_core::{
  CheckoutError, LineItem, MemoryOrderStore, Order, OrderDraft, OrderLedger, OrderStatus, OrderStore, PaymentStatus,
  StatusUpdate,
};
use uuid::Uuid;

fn draft(user: &str) -> OrderDraft {
  OrderDraft::new(user, vec![LineItem::new("P1", 2)], dec!(102), "221B Baker St")
}

fn ledger_over(store: &MemoryOrderStore) -> OrderLedger {
  OrderLedger::new(Arc::new(store.clone()))
}

fn legacy_order(minutes_ago: i64) -> Order {
  let created = Utc::now() - Duration::minutes(minutes_ago);
  Order {
    id: Uuid::new_v4(),
    order_id: String::new(),
    user_id: "legacy_user".to_string(),
    items: vec![LineItem::new("P1", 1)],
    amount: dec!(51),
    address: "Old Town".to_string(),
    status: OrderStatus::Placed,
    payment_status: PaymentStatus::Pending,
    payment_provider_order_ref: None,
    payment_id: None,
    paid_at: None,
    created_at: created,
    updated_at: created,
  }
}

#[tokio::test]
async fn test_create_assigns_order_id_and_initial_status() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let ledger = ledger_over(&store);

  let order = ledger.create(draft("user_1")).await.unwrap();
  assert!(order.order_id.starts_with("ORD-"));
  assert_eq!(order.status, OrderStatus::Placed);
  assert_eq!(order.payment_status, PaymentStatus::Pending);
  assert_eq!(order.amount, dec!(102));

  let found = ledger.find_by_order_id(&order.order_id).await.unwrap();
  assert_eq!(found, order);
  assert_eq!(ledger.find_by_id(order.id).await.unwrap(), order);
}

#[tokio::test]
async fn test_create_rejects_invalid_drafts_without_writing() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let ledger = ledger_over(&store);

  let bad = [
    OrderDraft::new("", vec![LineItem::new("P1", 1)], dec!(1), "A"),
    OrderDraft::new("u", vec![], dec!(1), "A"),
    OrderDraft::new("u", vec![LineItem::new("P1", 0)], dec!(1), "A"),
    OrderDraft::new("u", vec![LineItem::new("P1", 1)], dec!(-1), "A"),
    OrderDraft::new("u", vec![LineItem::new("P1", 1)], dec!(1), " "),
  ];
  for d in bad {
    assert!(matches!(ledger.create(d).await, Err(CheckoutError::Validation(_))));
  }
  assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_creates_get_unique_order_ids() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let ledger = Arc::new(ledger_over(&store));

  let mut handles = Vec::with_capacity(10_000);
  for i in 0..10_000 {
    let ledger = ledger.clone();
    handles.push(tokio::spawn(async move { ledger.create(draft(&format!("user_{}", i % 17))).await }));
  }

  let mut ids = HashSet::new();
  for handle in handles {
    let order = handle.await.unwrap().unwrap();
    assert!(!order.order_id.is_empty());
    ids.insert(order.order_id);
  }
  assert_eq!(ids.len(), 10_000);
  assert_eq!(store.len().await, 10_000);
}

#[tokio::test]
async fn test_generated_collision_is_retried() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = calls.clone();
  // First two calls collide, third is fresh.
  let ledger = ledger_over(&store).with_id_generator(Arc::new(move || {
    match counter.fetch_add(1, Ordering::SeqCst) {
      0 | 1 => "ORD-1-fixed".to_string(),
      n => format!("ORD-1-fresh{}", n),
    }
  }));

  let first = ledger.create(draft("a")).await.unwrap();
  assert_eq!(first.order_id, "ORD-1-fixed");
  let second = ledger.create(draft("b")).await.unwrap();
  assert_eq!(second.order_id, "ORD-1-fresh2");
  assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_persistent_collision_surfaces_conflict() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let ledger = ledger_over(&store).with_id_generator(Arc::new(|| "ORD-1-same".to_string()));

  ledger.create(draft("a")).await.unwrap();
  let err = ledger.create(draft("b")).await.unwrap_err();
  assert!(matches!(err, CheckoutError::Conflict(_)));
  assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_explicit_order_id_collision_is_not_regenerated() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let ledger = ledger_over(&store);

  let mut explicit = draft("a");
  explicit.order_id = Some("ORD-explicit".to_string());
  ledger.create(explicit.clone()).await.unwrap();
  assert!(matches!(ledger.create(explicit).await, Err(CheckoutError::Conflict(_))));
}

#[tokio::test]
async fn test_empty_generated_id_is_integrity_error() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let ledger = ledger_over(&store).with_id_generator(Arc::new(String::new));
  assert!(matches!(ledger.create(draft("a")).await, Err(CheckoutError::Integrity(_))));
  assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_create_many_is_atomic() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let ledger = ledger_over(&store);

  let created = ledger.create_many(vec![draft("a"), draft("b"), draft("c")]).await.unwrap();
  assert_eq!(created.len(), 3);
  let ids: HashSet<_> = created.iter().map(|o| o.order_id.clone()).collect();
  assert_eq!(ids.len(), 3);

  let bad = ledger
    .create_many(vec![draft("d"), OrderDraft::new("e", vec![], dec!(1), "A")])
    .await;
  assert!(matches!(bad, Err(CheckoutError::Validation(_))));
  assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn test_lookups_report_not_found() {
  setup_tracing();
  let ledger = ledger_over(&MemoryOrderStore::new());
  assert!(matches!(ledger.find_by_order_id("ORD-nope").await, Err(CheckoutError::NotFound(_))));
  assert!(matches!(ledger.find_by_id(Uuid::new_v4()).await, Err(CheckoutError::NotFound(_))));
  assert!(matches!(ledger.find_by_provider_ref("order_nope").await, Err(CheckoutError::NotFound(_))));
  assert!(matches!(ledger.delete("ORD-nope").await, Err(CheckoutError::NotFound(_))));

  let order = ledger.create(draft("a")).await.unwrap();
  ledger.delete(&order.order_id).await.unwrap();
  assert!(matches!(ledger.find_by_order_id(&order.order_id).await, Err(CheckoutError::NotFound(_))));
}

#[tokio::test]
async fn test_reading_legacy_row_is_integrity_error() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let legacy = store.insert(legacy_order(5)).await.unwrap();
  let ledger = ledger_over(&store);
  assert!(matches!(ledger.find_by_id(legacy.id).await, Err(CheckoutError::Integrity(_))));
}

#[tokio::test]
async fn test_update_status_follows_transitions() {
  setup_tracing();
  let ledger = ledger_over(&MemoryOrderStore::new());
  let order = ledger.create(draft("a")).await.unwrap();
  let to = StatusUpdate::new;

  assert!(matches!(
    ledger.update_status(&order.order_id, to(OrderStatus::Shipped)).await,
    Err(CheckoutError::Validation(_))
  ));
  // PAID only comes from a verified payment.
  assert!(matches!(
    ledger.update_status(&order.order_id, to(OrderStatus::Paid)).await,
    Err(CheckoutError::Validation(_))
  ));
  let unchanged = ledger.find_by_order_id(&order.order_id).await.unwrap();
  assert_eq!(unchanged.status, OrderStatus::Placed);
  assert_eq!(unchanged.payment_status, PaymentStatus::Pending);

  ledger.attach_provider_ref(&order.order_id, "order_abc").await.unwrap();
  let paid = ledger.record_payment("order_abc", "pay_1", Utc::now()).await.unwrap();
  assert_eq!(paid.status, OrderStatus::Paid);

  let shipped = ledger.update_status(&order.order_id, to(OrderStatus::Shipped)).await.unwrap();
  assert_eq!(shipped.status, OrderStatus::Shipped);
  assert_eq!(shipped.payment_status, PaymentStatus::Completed);
  let delivered = ledger.update_status(&order.order_id, to(OrderStatus::Delivered)).await.unwrap();
  assert_eq!(delivered.status, OrderStatus::Delivered);
  assert!(delivered.updated_at >= order.updated_at);

  assert!(matches!(
    ledger.update_status(&order.order_id, to(OrderStatus::Cancelled)).await,
    Err(CheckoutError::Validation(_))
  ));
  assert!(matches!(
    ledger.update_status("ORD-missing", to(OrderStatus::Shipped)).await,
    Err(CheckoutError::NotFound(_))
  ));
}

#[tokio::test]
async fn test_record_payment_is_idempotent() {
  setup_tracing();
  let ledger = ledger_over(&MemoryOrderStore::new());
  let order = ledger.create(draft("a")).await.unwrap();
  ledger.attach_provider_ref(&order.order_id, "order_abc").await.unwrap();

  let first = ledger.record_payment("order_abc", "pay_1", Utc::now()).await.unwrap();
  let again = ledger.record_payment("order_abc", "pay_2", Utc::now()).await.unwrap();

  assert_eq!(first.status, OrderStatus::Paid);
  assert_eq!(first.payment_status, PaymentStatus::Completed);
  assert_eq!(first, again);
  assert_eq!(again.payment_id.as_deref(), Some("pay_1"));
}

#[tokio::test]
async fn test_record_payment_refuses_cancelled_order() {
  setup_tracing();
  let ledger = ledger_over(&MemoryOrderStore::new());
  let order = ledger.create(draft("a")).await.unwrap();
  ledger.attach_provider_ref(&order.order_id, "order_abc").await.unwrap();
  ledger
    .update_status(&order.order_id, StatusUpdate::new(OrderStatus::Cancelled))
    .await
    .unwrap();

  let err = ledger.record_payment("order_abc", "pay_1", Utc::now()).await.unwrap_err();
  assert!(matches!(err, CheckoutError::Conflict(_)));

  let after = ledger.find_by_order_id(&order.order_id).await.unwrap();
  assert_eq!(after.status, OrderStatus::Cancelled);
  assert_eq!(after.payment_status, PaymentStatus::Pending);
  assert!(after.payment_id.is_none());
}

#[tokio::test]
async fn test_repeat_payment_on_shipped_order_keeps_fulfillment_state() {
  setup_tracing();
  let ledger = ledger_over(&MemoryOrderStore::new());
  let order = ledger.create(draft("a")).await.unwrap();
  ledger.attach_provider_ref(&order.order_id, "order_abc").await.unwrap();
  ledger.record_payment("order_abc", "pay_1", Utc::now()).await.unwrap();
  ledger
    .update_status(&order.order_id, StatusUpdate::new(OrderStatus::Shipped))
    .await
    .unwrap();

  let again = ledger.record_payment("order_abc", "pay_2", Utc::now()).await.unwrap();
  assert_eq!(again.status, OrderStatus::Shipped);
  assert_eq!(again.payment_id.as_deref(), Some("pay_1"));
}

#[tokio::test]
async fn test_delete_removes_order() {
  setup_tracing();
  let ledger = ledger_over(&MemoryOrderStore::new());
  let order = ledger.create(draft("a")).await.unwrap();
  ledger.delete(&order.order_id).await.unwrap();
  assert!(matches!(ledger.find_by_order_id(&order.order_id).await, Err(CheckoutError::NotFound(_))));
}

#[tokio::test]
async fn test_backfill_repairs_legacy_rows_once() {
  setup_tracing();
  let store = MemoryOrderStore::new();
  let ledger = ledger_over(&store);
  ledger.create(draft("modern")).await.unwrap();
  let old = store.insert(legacy_order(30)).await.unwrap();
  let older = store.insert(legacy_order(60)).await.unwrap();

  let report = ledger.backfill_missing_order_ids().await.unwrap();
  assert_eq!(report.scanned, 2);
  assert_eq!(report.repaired, 2);

  // Oldest first, indexed by position.
  let (first_id, first_order_id) = &report.assigned[0];
  assert_eq!(*first_id, older.id);
  assert!(first_order_id.starts_with(&format!("ORD-{}-000-", older.created_at.timestamp_millis())));
  let (second_id, second_order_id) = &report.assigned[1];
  assert_eq!(*second_id, old.id);
  assert!(second_order_id.starts_with(&format!("ORD-{}-001-", old.created_at.timestamp_millis())));

  let repaired = ledger.find_by_id(old.id).await.unwrap();
  assert_eq!(&repaired.order_id, second_order_id);

  let again = ledger.backfill_missing_order_ids().await.unwrap();
  assert_eq!(again.scanned, 0);
  assert_eq!(again.repaired, 0);
}
