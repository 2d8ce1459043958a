// storefront/src/web/handlers/admin.rs

//! Seller-only maintenance endpoints.

use actix_web::{web, HttpResponse};
use serde_json::json;
use storefront_core::StatusUpdate;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::backfill_order_ids", skip(app_state, user), fields(user_id = %user.0.user_id))]
pub async fn backfill_order_ids_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state.sellers.authorize(Some(&user.0))?;
  let report = app_state.ledger.backfill_missing_order_ids().await?;
  info!(scanned = report.scanned, repaired = report.repaired, "Order id backfill finished.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": format!("Repaired {} of {} orders", report.repaired, report.scanned),
    "report": report,
  })))
}

#[instrument(name = "handler::update_order_status", skip(app_state, user, payload), fields(user_id = %user.0.user_id))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
  payload: web::Json<StatusUpdate>,
) -> Result<HttpResponse, AppError> {
  app_state.sellers.authorize(Some(&user.0))?;
  let order_id = path.into_inner();
  let order = app_state
    .ledger
    .update_status(&order_id, payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order status updated",
    "order": order.summary(),
  })))
}
