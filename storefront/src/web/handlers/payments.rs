// storefront/src/web/handlers/payments.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use storefront_core::PaymentCallback;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

/// Client-side payment callback. The HMAC signature is the only credential,
/// so no caller identity is required.
#[instrument(name = "handler::verify_payment", skip(app_state, payload))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<PaymentCallback>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.verifier.verify(&payload).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Payment verified successfully",
    "order": order.summary(),
  })))
}
