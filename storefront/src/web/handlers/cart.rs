// storefront/src/web/handlers/cart.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use storefront_core::CheckoutError;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdatePayload {
  pub cart_data: Value,
}

#[instrument(name = "handler::update_cart", skip(app_state, user, payload), fields(user_id = %user.0.user_id))]
pub async fn update_cart_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: web::Json<CartUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let cart = payload.into_inner().cart_data;
  if !cart.is_object() {
    return Err(CheckoutError::Validation("cartData must be an object".to_string()).into());
  }
  app_state.carts.replace(&user.0.user_id, cart).await?;
  info!("Cart replaced.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Cart Updated" })))
}

#[instrument(name = "handler::get_cart", skip(app_state, user), fields(user_id = %user.0.user_id))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.carts.get(&user.0.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "cartData": cart })))
}
