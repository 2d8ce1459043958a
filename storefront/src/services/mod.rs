// storefront/src/services/mod.rs

//! Outbound payment provider clients.

pub mod payment_gateway;
pub mod payment_mock;

pub use payment_gateway::RazorpayGateway;
pub use payment_mock::MockPaymentGateway;

use std::sync::Arc;
use storefront_core::PaymentGateway;
use tracing::info;

use crate::config::{AppConfig, PaymentProviderKind};
use crate::errors::Result;

/// Picks the provider named by `PAYMENT_PROVIDER`.
pub fn build_gateway(config: &AppConfig) -> Result<Arc<dyn PaymentGateway>> {
  let gateway: Arc<dyn PaymentGateway> = match config.payment_provider {
    PaymentProviderKind::Razorpay => Arc::new(RazorpayGateway::new(
      config.payment_api_base.clone(),
      config.payment_key_id.clone(),
      config.payment_key_secret.clone(),
      config.gateway_timeout,
    )?),
    PaymentProviderKind::Mock => Arc::new(MockPaymentGateway::default()),
  };
  info!(provider = ?config.payment_provider, "Payment provider client ready.");
  Ok(gateway)
}
