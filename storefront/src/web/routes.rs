// storefront/src/web/routes.rs

use actix_web::{error::JsonPayloadError, web, HttpRequest};
use storefront_core::CheckoutError;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::{admin, cart, orders, payments};

async fn health_check_handler(app_state: web::Data<AppState>) -> actix_web::HttpResponse {
  let config = &app_state.config;
  actix_web::HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "paymentProvider": config.payment_provider.as_str(),
    "currency": config.currency,
  }))
}

/// Malformed JSON bodies get the usual `{success:false, message}` envelope.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::from(CheckoutError::Validation(format!("invalid request body: {}", err))).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler));
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::post().to(orders::place_order_handler))
          .route("/{order_id}", web::get().to(orders::get_order_handler)),
      )
      .route("/payments/verify", web::post().to(payments::verify_payment_handler))
      .service(
        web::resource("/cart")
          .route(web::get().to(cart::get_cart_handler))
          .route(web::put().to(cart::update_cart_handler)),
      )
      .service(
        web::scope("/admin/orders")
          .route("/backfill-order-ids", web::post().to(admin::backfill_order_ids_handler))
          .route("/{order_id}/status", web::patch().to(admin::update_order_status_handler)),
      ),
  );
}
