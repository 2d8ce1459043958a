// storefront-core/src/error.rs
use thiserror::Error;

/// Failures raised by the pipeline engine itself rather than by a handler.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for required step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Step '{step_name}' left the context incomplete: {message}")]
  IncompleteContext { step_name: String, message: String },
}

/// Everything that can go wrong while placing, paying for, or repairing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
  #[error("Not authenticated: {0}")]
  Unauthenticated(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Invalid request: {0}")]
  Validation(String),

  #[error("Not found: {0}")]
  NotFound(String),

  /// Unique-key collision that survived the internal retries.
  #[error("Conflict: {0}")]
  Conflict(String),

  /// Payment provider unreachable, timed out, or rejected the request.
  #[error("Payment gateway error: {0}")]
  Gateway(String),

  /// The order was persisted but no provider order could be opened for it.
  /// Carries the `orderId` so the client can resume payment later.
  #[error("Payment gateway error for order {order_id}: {reason}")]
  GatewayPending { order_id: String, reason: String },

  #[error("Payment verification failed: {0}")]
  Verification(String),

  /// A stored record violates an invariant (e.g. an order without `orderId`).
  #[error("Data integrity violation: {0}")]
  Integrity(String),

  #[error("Storage error: {source}")]
  Storage {
    #[source]
    source: anyhow::Error,
  },

  #[error("Workflow error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },
}

impl CheckoutError {
  pub fn storage(source: impl Into<anyhow::Error>) -> Self {
    CheckoutError::Storage { source: source.into() }
  }

  /// Whether the same request may succeed if sent again unchanged.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      CheckoutError::Gateway(_) | CheckoutError::GatewayPending { .. } | CheckoutError::Storage { .. }
    )
  }

  /// The persisted order a failure left behind, if any.
  pub fn pending_order_id(&self) -> Option<&str> {
    match self {
      CheckoutError::GatewayPending { order_id, .. } => Some(order_id),
      _ => None,
    }
  }
}

pub type CheckoutResult<T, E = CheckoutError> = std::result::Result<T, E>;
