// storefront-core/src/verification.rs

//! Confirms a payment reported by the client against the provider signature
//! and moves the correlated order to PAID exactly once.

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{CheckoutError, CheckoutResult};
use crate::ledger::OrderLedger;
use crate::order::Order;

type HmacSha256 = Hmac<Sha256>;

/// Payment confirmation as posted by the client after the provider checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
  #[serde(alias = "razorpay_order_id")]
  pub provider_order_ref: String,
  #[serde(alias = "razorpay_payment_id")]
  pub provider_payment_ref: String,
  #[serde(alias = "razorpay_signature")]
  pub provider_signature: String,
}

/// HMAC-SHA256 signer keyed by the provider key secret.
#[derive(Clone)]
pub struct PaymentSignature {
  secret: SecretString,
}

impl std::fmt::Debug for PaymentSignature {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PaymentSignature").field("secret", &"[REDACTED]").finish()
  }
}

impl PaymentSignature {
  pub fn new(secret: SecretString) -> Self {
    Self { secret }
  }

  fn mac(&self, provider_order_ref: &str, provider_payment_ref: &str) -> CheckoutResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
      .map_err(|e| CheckoutError::Verification(format!("invalid signing key: {}", e)))?;
    mac.update(provider_order_ref.as_bytes());
    mac.update(b"|");
    mac.update(provider_payment_ref.as_bytes());
    Ok(mac)
  }

  /// Lowercase hex of `HMAC-SHA256(secret, "<order>|<payment>")`.
  pub fn expected_signature(&self, provider_order_ref: &str, provider_payment_ref: &str) -> CheckoutResult<String> {
    Ok(hex::encode(
      self.mac(provider_order_ref, provider_payment_ref)?.finalize().into_bytes(),
    ))
  }

  /// Constant-time check of a hex signature. Malformed hex never matches.
  pub fn matches(&self, provider_order_ref: &str, provider_payment_ref: &str, signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
      return false;
    };
    match self.mac(provider_order_ref, provider_payment_ref) {
      Ok(mac) => mac.verify_slice(&provided).is_ok(),
      Err(_) => false,
    }
  }
}

#[derive(Clone)]
pub struct PaymentVerifier {
  ledger: Arc<OrderLedger>,
  signature: PaymentSignature,
}

impl PaymentVerifier {
  pub fn new(ledger: Arc<OrderLedger>, signature: PaymentSignature) -> Self {
    Self { ledger, signature }
  }

  /// Verifies the signature, then records the payment. Re-verifying a paid
  /// order returns it unchanged.
  #[instrument(
    name = "PaymentVerifier::verify",
    skip(self, callback),
    fields(provider_ref = %callback.provider_order_ref, payment_ref = %callback.provider_payment_ref),
    err(Display)
  )]
  pub async fn verify(&self, callback: &PaymentCallback) -> CheckoutResult<Order> {
    let order_ref = callback.provider_order_ref.trim();
    let payment_ref = callback.provider_payment_ref.trim();
    if order_ref.is_empty() || payment_ref.is_empty() || callback.provider_signature.trim().is_empty() {
      return Err(CheckoutError::Validation(
        "providerOrderRef, providerPaymentRef and providerSignature are required".to_string(),
      ));
    }

    if !self.signature.matches(order_ref, payment_ref, &callback.provider_signature) {
      warn!("Payment signature mismatch.");
      return Err(CheckoutError::Verification("signature mismatch".to_string()));
    }

    let order = self.ledger.record_payment(order_ref, payment_ref, Utc::now()).await?;
    if order.payment_id.as_deref() == Some(payment_ref) {
      info!(order_id = %order.order_id, "Payment verified, order marked PAID.");
    } else {
      warn!(order_id = %order.order_id, kept = ?order.payment_id, "Order was already paid; keeping the first payment.");
    }
    Ok(order)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn signer() -> PaymentSignature {
    PaymentSignature::new(SecretString::from("s3cret".to_string()))
  }

  #[test]
  fn test_signature_round_trip() {
    let signature = signer().expected_signature("order_abc", "pay_xyz").unwrap();
    assert_eq!(signature.len(), 64);
    assert!(signer().matches("order_abc", "pay_xyz", &signature));
    assert!(signer().matches("order_abc", "pay_xyz", &signature.to_uppercase()));
  }

  #[test]
  fn test_signature_matches_known_vector() {
    // Reference value from an independent HMAC-SHA256 implementation.
    assert_eq!(
      signer().expected_signature("order_abc", "pay_xyz").unwrap(),
      "69d2d55b3175eb1d5c503399ed52b90c1f0326286864d5042cdf2c46598162e7"
    );
    assert_eq!(
      signer().expected_signature("order_abc", "").unwrap(),
      "c92ee919798a38b67a80f35cfd94d148f0a448394e5f03810e3123ed07d0f739"
    );
  }

  #[test]
  fn test_tampered_inputs_do_not_match() {
    let signature = signer().expected_signature("order_abc", "pay_xyz").unwrap();
    assert!(!signer().matches("order_abc", "pay_other", &signature));
    assert!(!signer().matches("order_abd", "pay_xyz", &signature));
    assert!(!signer().matches("order_abc", "pay_xyz", "not-hex"));
    assert!(!signer().matches("order_abc", "pay_xyz", &signature[..62]));

    let other_key = PaymentSignature::new(SecretString::from("other".to_string()));
    assert!(!other_key.matches("order_abc", "pay_xyz", &signature));
  }

  #[test]
  fn test_callback_accepts_provider_field_names() {
    let callback: PaymentCallback = serde_json::from_value(serde_json::json!({
      "razorpay_order_id": "order_abc",
      "razorpay_payment_id": "pay_xyz",
      "razorpay_signature": "00"
    }))
    .unwrap();
    assert_eq!(callback.provider_order_ref, "order_abc");
    assert_eq!(callback.provider_payment_ref, "pay_xyz");
  }

  #[test]
  fn test_debug_redacts_secret() {
    assert!(!format!("{:?}", signer()).contains("s3cret"));
  }
}
