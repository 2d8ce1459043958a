// storefront-core/src/gateway.rs

//! Payment-provider port and the adapter that turns a persisted order into a
//! provider-side order plus the parameters the client needs to pay it.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::error::{CheckoutError, CheckoutResult};
use crate::order::Order;

/// Body of a provider "create order" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderOrderRequest {
  /// Amount in minor currency units (paise, cents).
  pub amount: i64,
  pub currency: String,
  pub receipt: String,
  pub notes: BTreeMap<String, String>,
  pub payment_capture: u8,
}

/// What the provider hands back for a created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOrder {
  pub id: String,
  pub amount: i64,
  pub currency: String,
  #[serde(default)]
  pub receipt: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Creates an order on the provider side. Failures must be reported as `CheckoutError::Gateway`.
  async fn create_order(&self, request: &ProviderOrderRequest) -> CheckoutResult<ProviderOrder>;
}

/// Parameters the client uses to open the provider's payment flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInit {
  /// Provider order reference.
  pub order_id: String,
  pub amount: i64,
  pub currency: String,
  /// Public key id. The key secret never leaves the server.
  pub key: String,
}

/// `round(amount * 100)`, halves away from zero.
pub fn to_minor_units(amount: Decimal) -> CheckoutResult<i64> {
  (amount * Decimal::ONE_HUNDRED)
    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    .to_i64()
    .ok_or_else(|| CheckoutError::Validation(format!("amount {} is out of range", amount)))
}

#[derive(Clone)]
pub struct PaymentGatewayAdapter {
  gateway: Arc<dyn PaymentGateway>,
  currency: String,
  key_id: String,
  timeout: Option<Duration>,
}

impl PaymentGatewayAdapter {
  pub fn new(gateway: Arc<dyn PaymentGateway>, currency: impl Into<String>, key_id: impl Into<String>) -> Self {
    Self {
      gateway,
      currency: currency.into(),
      key_id: key_id.into(),
      timeout: None,
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn currency(&self) -> &str {
    &self.currency
  }

  pub fn request_for(&self, order: &Order) -> CheckoutResult<ProviderOrderRequest> {
    let mut notes = BTreeMap::new();
    notes.insert("orderId".to_string(), order.order_id.clone());
    notes.insert("userId".to_string(), order.user_id.clone());
    Ok(ProviderOrderRequest {
      amount: to_minor_units(order.amount)?,
      currency: self.currency.clone(),
      receipt: order.order_id.clone(),
      notes,
      payment_capture: 1,
    })
  }

  /// Single attempt; a failure or timeout is returned as a retryable `Gateway` error.
  #[instrument(name = "PaymentGatewayAdapter::create_provider_order", skip(self, order), fields(order_id = %order.order_id), err(Display))]
  pub async fn create_provider_order(&self, order: &Order) -> CheckoutResult<ProviderOrder> {
    let request = self.request_for(order)?;
    let call = self.gateway.create_order(&request);
    let provider_order = match self.timeout {
      Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
        error!(timeout_ms = limit.as_millis() as u64, "Payment provider call timed out.");
        CheckoutError::Gateway(format!("payment provider did not answer within {}ms", limit.as_millis()))
      })??,
      None => call.await?,
    };
    if provider_order.id.trim().is_empty() {
      return Err(CheckoutError::Gateway("payment provider returned an empty order id".to_string()));
    }
    info!(provider_ref = %provider_order.id, amount = provider_order.amount, "Provider order created.");
    Ok(provider_order)
  }

  pub fn payment_init(&self, provider_order: &ProviderOrder) -> PaymentInit {
    PaymentInit {
      order_id: provider_order.id.clone(),
      amount: provider_order.amount,
      currency: provider_order.currency.clone(),
      key: self.key_id.clone(),
    }
  }
}
