// storefront/src/web/handlers/orders.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use storefront_core::{CheckoutError, CheckoutRequest};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{AuthenticatedUser, MaybePrincipal};

#[instrument(
  name = "handler::place_order",
  skip(app_state, caller, body),
  fields(user_id = caller.0.as_ref().map(|p| p.user_id.as_str()).unwrap_or("-"))
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  caller: MaybePrincipal,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let request = match serde_json::from_slice::<CheckoutRequest>(&body) {
    Ok(request) => request,
    // Identity is checked before the payload, so an anonymous caller still gets 401.
    Err(_) if caller.0.is_none() => CheckoutRequest::default(),
    Err(e) => return Err(CheckoutError::Validation(format!("invalid order payload: {}", e)).into()),
  };
  let outcome = app_state.checkout.place_order(caller.0, request).await?;
  info!(order_id = %outcome.order.order_id, amount = %outcome.order.amount, "Order placed.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order Placed Successfully",
    "order": outcome.order,
    "payment": outcome.payment,
  })))
}

/// Only the owner sees an order; anyone else gets the same 404 as a missing one.
#[instrument(name = "handler::get_order", skip(app_state, user), fields(user_id = %user.0.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = app_state.ledger.find_by_order_id(&order_id).await?;
  if order.user_id != user.0.user_id {
    return Err(CheckoutError::NotFound(format!("order {}", order_id)).into());
  }
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "order": order.summary(),
  })))
}
