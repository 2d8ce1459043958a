// storefront/src/services/payment_mock.rs
use async_trait::async_trait;
use storefront_core::{CheckoutError, CheckoutResult, PaymentGateway, ProviderOrder, ProviderOrderRequest};
use tracing::{info, instrument};
use uuid::Uuid;

/// In-process provider used when `PAYMENT_PROVIDER=mock`.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
  /// Simulated network latency.
  pub latency: std::time::Duration,
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
  #[instrument(name = "MockPaymentGateway::create_order", skip(self, request), fields(receipt = %request.receipt, amount = request.amount))]
  async fn create_order(&self, request: &ProviderOrderRequest) -> CheckoutResult<ProviderOrder> {
    if request.amount <= 0 {
      return Err(CheckoutError::Gateway("amount must be greater than zero".to_string()));
    }
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }

    let id = format!("order_mock_{}", Uuid::new_v4().simple());
    info!(provider_ref = %id, "Simulated provider order creation.");
    Ok(ProviderOrder {
      id,
      amount: request.amount,
      currency: request.currency.clone(),
      receipt: Some(request.receipt.clone()),
    })
  }
}
