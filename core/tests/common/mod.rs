// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::Value;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use storefront_core::{
  CartStore, CheckoutDeps, CheckoutError, CheckoutResult, CheckoutService, ContextData, FlowError, MemoryCartStore,
  Handler, MemoryOrderStore, Order, OrderLedger, OrderStatus, OrderStore, PaymentGateway, PaymentGatewayAdapter, PaymentSignature,
  PipelineControl, PricingCalculator, ProviderOrder, ProviderOrderRequest, StaticPriceList,
};
use tracing::Level;
use uuid::Uuid;

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Workflow fixtures ---
/// Records which stages of a toy order run were visited.
#[derive(Clone, Debug, Default)]
pub struct StageTrail {
  pub visits: i32,
  pub journal: String,
  pub stages: Vec<String>,
  pub halt_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TrailError {
  #[error("engine: {0}")]
  Engine(String),

  #[error("stage failed: {0}")]
  Stage(String),
}

impl From<FlowError> for TrailError {
  fn from(e: FlowError) -> Self {
    TrailError::Engine(format!("{:?}", e))
  }
}

/// Appends `note` to the journal and halts if the trail asks to stop here.
pub fn record_stage(stage: &'static str, note: &'static str) -> Handler<StageTrail, TrailError> {
  Box::new(move |ctx: ContextData<StageTrail>| {
    Box::pin(async move {
      let mut trail = ctx.write();
      trail.visits += 1;
      trail.journal.push_str(note);
      trail.stages.push(stage.to_string());
      Ok(if trail.halt_at.as_deref() == Some(stage) {
        PipelineControl::Stop
      } else {
        PipelineControl::Continue
      })
    })
  })
}

pub fn failing_stage(stage: &'static str, reason: &'static str) -> Handler<StageTrail, TrailError> {
  Box::new(move |ctx: ContextData<StageTrail>| {
    Box::pin(async move {
      ctx.write().stages.push(stage.to_string());
      Err(TrailError::Stage(reason.to_string()))
    })
  })
}

// --- Checkout fixtures ---
pub const TEST_SECRET: &str = "s3cret";
pub const TEST_KEY_ID: &str = "rzp_test_key";

pub fn price_list() -> StaticPriceList {
  StaticPriceList::new()
    .with_price("P1", dec!(50))
    .with_price("P2", dec!(19.99))
    .with_price("P3", dec!(250))
}

pub fn signer() -> PaymentSignature {
  PaymentSignature::new(SecretString::from(TEST_SECRET.to_string()))
}

pub fn sign(provider_order_ref: &str, provider_payment_ref: &str) -> String {
  signer()
    .expected_signature(provider_order_ref, provider_payment_ref)
    .expect("signing with a test key")
}

/// Provider double: hands out `order_test_<n>` references, or fails every call.
#[derive(Default)]
pub struct MockGateway {
  pub fail: bool,
  pub calls: AtomicUsize,
  pub requests: Mutex<Vec<ProviderOrderRequest>>,
}

impl MockGateway {
  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Default::default()
    }
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  async fn create_order(&self, request: &ProviderOrderRequest) -> CheckoutResult<ProviderOrder> {
    let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    self.requests.lock().push(request.clone());
    if self.fail {
      return Err(CheckoutError::Gateway("provider unavailable".to_string()));
    }
    Ok(ProviderOrder {
      id: format!("order_test_{}", n),
      amount: request.amount,
      currency: request.currency.clone(),
      receipt: Some(request.receipt.clone()),
    })
  }
}

/// Cart store whose `clear` always fails.
#[derive(Default)]
pub struct BrokenCartStore {
  inner: MemoryCartStore,
}

#[async_trait]
impl CartStore for BrokenCartStore {
  async fn get(&self, user_id: &str) -> CheckoutResult<Value> {
    self.inner.get(user_id).await
  }

  async fn replace(&self, user_id: &str, cart: Value) -> CheckoutResult<()> {
    self.inner.replace(user_id, cart).await
  }

  async fn clear(&self, _user_id: &str) -> CheckoutResult<()> {
    Err(CheckoutError::storage(anyhow::anyhow!("cart table unavailable")))
  }
}

/// Wraps a `MemoryOrderStore`; can be told to fail recording provider references.
#[derive(Clone, Default)]
pub struct FlakyOrderStore {
  pub inner: MemoryOrderStore,
  pub fail_provider_ref: bool,
}

#[async_trait]
impl OrderStore for FlakyOrderStore {
  async fn insert(&self, order: Order) -> CheckoutResult<Order> {
    self.inner.insert(order).await
  }

  async fn insert_many(&self, orders: Vec<Order>) -> CheckoutResult<Vec<Order>> {
    self.inner.insert_many(orders).await
  }

  async fn find_by_id(&self, id: Uuid) -> CheckoutResult<Option<Order>> {
    self.inner.find_by_id(id).await
  }

  async fn find_by_order_id(&self, order_id: &str) -> CheckoutResult<Option<Order>> {
    self.inner.find_by_order_id(order_id).await
  }

  async fn find_by_provider_ref(&self, provider_ref: &str) -> CheckoutResult<Option<Order>> {
    self.inner.find_by_provider_ref(provider_ref).await
  }

  async fn transition_status(
    &self,
    order_id: &str,
    allowed_from: &[OrderStatus],
    next: OrderStatus,
    now: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>> {
    self.inner.transition_status(order_id, allowed_from, next, now).await
  }

  async fn set_provider_ref(
    &self,
    order_id: &str,
    provider_ref: &str,
    now: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>> {
    if self.fail_provider_ref {
      return Err(CheckoutError::storage(anyhow::anyhow!("connection reset")));
    }
    self.inner.set_provider_ref(order_id, provider_ref, now).await
  }

  async fn mark_paid(
    &self,
    provider_ref: &str,
    payment_id: &str,
    paid_at: DateTime<Utc>,
  ) -> CheckoutResult<Option<Order>> {
    self.inner.mark_paid(provider_ref, payment_id, paid_at).await
  }

  async fn find_missing_order_ids(&self) -> CheckoutResult<Vec<Order>> {
    self.inner.find_missing_order_ids().await
  }

  async fn assign_order_id(&self, id: Uuid, order_id: &str) -> CheckoutResult<bool> {
    self.inner.assign_order_id(id, order_id).await
  }

  async fn delete(&self, order_id: &str) -> CheckoutResult<bool> {
    self.inner.delete(order_id).await
  }
}

/// Everything a checkout test wants to poke at afterwards.
pub struct Harness {
  pub service: CheckoutService,
  pub store: MemoryOrderStore,
  pub ledger: Arc<OrderLedger>,
  pub gateway: Arc<MockGateway>,
  pub carts: Arc<dyn CartStore>,
}

pub struct HarnessBuilder {
  gateway: MockGateway,
  carts: Arc<dyn CartStore>,
  fail_provider_ref: bool,
}

impl Default for HarnessBuilder {
  fn default() -> Self {
    Self {
      gateway: MockGateway::default(),
      carts: Arc::new(MemoryCartStore::new()),
      fail_provider_ref: false,
    }
  }
}

impl HarnessBuilder {
  pub fn failing_gateway(mut self) -> Self {
    self.gateway = MockGateway::failing();
    self
  }

  pub fn broken_carts(mut self) -> Self {
    self.carts = Arc::new(BrokenCartStore::default());
    self
  }

  pub fn failing_provider_ref(mut self) -> Self {
    self.fail_provider_ref = true;
    self
  }

  pub fn build(self) -> Harness {
    let flaky = FlakyOrderStore {
      inner: MemoryOrderStore::new(),
      fail_provider_ref: self.fail_provider_ref,
    };
    let store = flaky.inner.clone();
    let ledger = Arc::new(OrderLedger::new(Arc::new(flaky)));
    let gateway = Arc::new(self.gateway);
    let deps = CheckoutDeps {
      ledger: ledger.clone(),
      pricing: PricingCalculator::new(Arc::new(price_list())),
      gateway: PaymentGatewayAdapter::new(gateway.clone(), "INR", TEST_KEY_ID),
      carts: self.carts.clone(),
    };
    Harness {
      service: CheckoutService::new(deps),
      store,
      ledger,
      gateway,
      carts: self.carts,
    }
  }
}

pub fn harness() -> Harness {
  HarnessBuilder::default().build()
}
