// storefront-core/src/checkout/mod.rs

//! Order creation: authenticate, validate, price, persist, open the provider
//! order, record its reference, clear the cart and answer.

mod context;
mod pipeline;

pub use context::{CheckoutCtxData, CheckoutDeps, CheckoutOutcome, CheckoutRequest, CheckoutStage};
pub use pipeline::build_checkout_pipeline;

use std::sync::Arc;
use tracing::{instrument, warn};

use crate::access::Principal;
use crate::error::{CheckoutError, CheckoutResult, FlowError};
use crate::ledger::OrderLedger;
use crate::workflow::{ContextData, Pipeline};

#[derive(Clone)]
pub struct CheckoutService {
  pipeline: Arc<Pipeline<CheckoutCtxData, CheckoutError>>,
  deps: Arc<CheckoutDeps>,
}

impl CheckoutService {
  pub fn new(deps: CheckoutDeps) -> Self {
    Self {
      pipeline: Arc::new(build_checkout_pipeline()),
      deps: Arc::new(deps),
    }
  }

  pub fn ledger(&self) -> &Arc<OrderLedger> {
    &self.deps.ledger
  }

  #[instrument(
    name = "CheckoutService::place_order",
    skip(self, principal, request),
    fields(user_id = principal.as_ref().map(|p| p.user_id.as_str()).unwrap_or("-"), items = request.items.len()),
    err(Display)
  )]
  pub async fn place_order(
    &self,
    principal: Option<Principal>,
    request: CheckoutRequest,
  ) -> CheckoutResult<CheckoutOutcome> {
    let ctx_data = ContextData::new(CheckoutCtxData::new(self.deps.clone(), principal, request));

    let run = self.pipeline.run(ctx_data.clone()).await;
    let (stage, outcome, order_id) = {
      let mut guard = ctx_data.write();
      (
        guard.stage,
        guard.outcome.take(),
        guard.order.as_ref().map(|o| o.order_id.clone()),
      )
    };

    let summary = run.inspect_err(|e| {
      warn!(?stage, order_id = order_id.as_deref().unwrap_or("-"), error = %e, "Checkout stopped before completion.");
    })?;
    if summary.is_degraded() {
      warn!(order_id = order_id.as_deref().unwrap_or("-"), degraded = ?summary.degraded_steps, "Checkout finished with degraded steps.");
    }

    outcome.ok_or_else(|| {
      CheckoutError::from(FlowError::IncompleteContext {
        step_name: pipeline::STEP_RESPOND.to_string(),
        message: format!("no response produced (last stage {:?})", stage),
      })
    })
  }
}
