// storefront-core/src/checkout/context.rs

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::access::Principal;
use crate::cart::CartStore;
use crate::error::{CheckoutError, CheckoutResult, FlowError};
use crate::gateway::{PaymentGatewayAdapter, PaymentInit, ProviderOrder};
use crate::ledger::OrderLedger;
use crate::order::{LineItem, Order, OrderSummary};
use crate::pricing::{Pricing, PricingCalculator};

/// Body of a "place order" call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub items: Vec<LineItem>,
}

impl CheckoutRequest {
  pub fn new(address: impl Into<String>, items: Vec<LineItem>) -> Self {
    Self {
      address: address.into(),
      items,
    }
  }

  pub fn validate(&self) -> CheckoutResult<()> {
    if self.items.is_empty() {
      return Err(CheckoutError::Validation("at least one item is required".to_string()));
    }
    for item in &self.items {
      if item.product.trim().is_empty() {
        return Err(CheckoutError::Validation("every item needs a product".to_string()));
      }
      if item.quantity == 0 {
        return Err(CheckoutError::Validation(format!(
          "quantity for {} must be positive",
          item.product
        )));
      }
    }
    if self.address.trim().is_empty() {
      return Err(CheckoutError::Validation("address is required".to_string()));
    }
    Ok(())
  }
}

/// Last stage an order-creation run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStage {
  Received,
  Validated,
  Priced,
  Persisted,
  GatewayOrdered,
  Responded,
}

/// Collaborators every checkout run works against.
#[derive(Clone)]
pub struct CheckoutDeps {
  pub ledger: Arc<OrderLedger>,
  pub pricing: PricingCalculator,
  pub gateway: PaymentGatewayAdapter,
  pub carts: Arc<dyn CartStore>,
}

/// What the client gets back from a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
  pub order: OrderSummary,
  pub payment: PaymentInit,
  #[serde(skip)]
  pub stage: CheckoutStage,
  #[serde(skip)]
  pub cart_cleared: bool,
}

/// State of one checkout run, shared by every pipeline step.
pub struct CheckoutCtxData {
  pub deps: Arc<CheckoutDeps>,
  pub principal: Option<Principal>,
  pub request: CheckoutRequest,
  pub stage: CheckoutStage,
  pub user_id: Option<String>,
  pub pricing: Option<Pricing>,
  pub order: Option<Order>,
  pub provider_order: Option<ProviderOrder>,
  pub cart_cleared: bool,
  pub outcome: Option<CheckoutOutcome>,
}

impl CheckoutCtxData {
  pub fn new(deps: Arc<CheckoutDeps>, principal: Option<Principal>, request: CheckoutRequest) -> Self {
    Self {
      deps,
      principal,
      request,
      stage: CheckoutStage::Received,
      user_id: None,
      pricing: None,
      order: None,
      provider_order: None,
      cart_cleared: false,
      outcome: None,
    }
  }
}

/// Pulls a value an earlier step should have stored.
pub(crate) fn expect_set<T: Clone>(value: &Option<T>, step_name: &str, what: &str) -> Result<T, FlowError> {
  value.clone().ok_or_else(|| FlowError::IncompleteContext {
    step_name: step_name.to_string(),
    message: format!("{} is not set", what),
  })
}
