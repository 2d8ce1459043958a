// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront_core::CheckoutError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Checkout(#[from] CheckoutError),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),
}

impl From<storefront_core::FlowError> for AppError {
  fn from(err: storefront_core::FlowError) -> Self {
    AppError::Checkout(err.into())
  }
}

impl AppError {
  /// Text safe to show a client. Internal details stay in the logs.
  fn public_message(&self) -> String {
    match self {
      AppError::Checkout(e) => match e {
        CheckoutError::Unauthenticated(m)
        | CheckoutError::Forbidden(m)
        | CheckoutError::Validation(m)
        | CheckoutError::NotFound(m)
        | CheckoutError::Conflict(m)
        | CheckoutError::Verification(m) => m.clone(),
        CheckoutError::Gateway(_) | CheckoutError::GatewayPending { .. } => {
          "Payment provider unavailable, please retry".to_string()
        }
        CheckoutError::Integrity(_) | CheckoutError::Storage { .. } | CheckoutError::Workflow { .. } => {
          "An internal error occurred".to_string()
        }
      },
      AppError::Config(_) | AppError::Sqlx(_) => "An internal error occurred".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Checkout(e) => match e {
        CheckoutError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        CheckoutError::Forbidden(_) => StatusCode::FORBIDDEN,
        CheckoutError::Validation(_) | CheckoutError::Verification(_) => StatusCode::BAD_REQUEST,
        CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::Conflict(_) => StatusCode::CONFLICT,
        CheckoutError::Gateway(_) | CheckoutError::GatewayPending { .. } => StatusCode::BAD_GATEWAY,
        CheckoutError::Integrity(_) | CheckoutError::Storage { .. } | CheckoutError::Workflow { .. } => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
      AppError::Config(_) | AppError::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }
    let mut body = json!({ "success": false, "message": self.public_message() });
    if let AppError::Checkout(e) = self {
      if e.is_retryable() {
        body["retryable"] = json!(true);
      }
      if let Some(order_id) = e.pending_order_id() {
        body["orderId"] = json!(order_id);
      }
    }
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
