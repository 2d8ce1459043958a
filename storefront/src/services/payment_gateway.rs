// storefront/src/services/payment_gateway.rs

//! Razorpay-compatible orders API client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use storefront_core::{CheckoutError, CheckoutResult, PaymentGateway, ProviderOrder, ProviderOrderRequest};
use tracing::{error, info, instrument};

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
  error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
  #[serde(default)]
  code: Option<String>,
  #[serde(default)]
  description: Option<String>,
}

pub struct RazorpayGateway {
  client: reqwest::Client,
  api_base: String,
  key_id: String,
  key_secret: SecretString,
}

impl RazorpayGateway {
  pub fn new(
    api_base: impl Into<String>,
    key_id: impl Into<String>,
    key_secret: SecretString,
    timeout: Duration,
  ) -> CheckoutResult<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| CheckoutError::Gateway(format!("could not build HTTP client: {}", e)))?;
    Ok(Self {
      client,
      api_base: api_base.into().trim_end_matches('/').to_string(),
      key_id: key_id.into(),
      key_secret,
    })
  }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
  #[instrument(name = "RazorpayGateway::create_order", skip(self, request), fields(receipt = %request.receipt, amount = request.amount))]
  async fn create_order(&self, request: &ProviderOrderRequest) -> CheckoutResult<ProviderOrder> {
    let url = format!("{}/v1/orders", self.api_base);
    let response = self
      .client
      .post(&url)
      .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
      .json(request)
      .send()
      .await
      .map_err(|e| {
        error!(error = %e, "Payment provider request failed.");
        CheckoutError::Gateway(if e.is_timeout() {
          "payment provider timed out".to_string()
        } else {
          "payment provider unreachable".to_string()
        })
      })?;

    let status = response.status();
    if !status.is_success() {
      let detail = response
        .json::<ProviderErrorBody>()
        .await
        .ok()
        .map(|b| {
          format!(
            "{}: {}",
            b.error.code.unwrap_or_default(),
            b.error.description.unwrap_or_default()
          )
        })
        .unwrap_or_default();
      error!(%status, %detail, "Payment provider rejected order creation.");
      return Err(CheckoutError::Gateway(format!("payment provider returned {}", status)));
    }

    let order: ProviderOrder = response.json().await.map_err(|e| {
      error!(error = %e, "Payment provider sent an unreadable order.");
      CheckoutError::Gateway("payment provider sent an unreadable response".to_string())
    })?;
    info!(provider_ref = %order.id, "Provider order created.");
    Ok(order)
  }
}
