// storefront-core/src/checkout/pipeline.rs

//! Step handlers of the order-creation pipeline.
//!
//! Handlers copy what they need out of the context, drop the guard, do their
//! I/O, then write results back. No guard is held across an `.await`.

use tracing::{info, warn};

use crate::access::require_principal;
use crate::checkout::context::{expect_set, CheckoutCtxData, CheckoutOutcome, CheckoutStage};
use crate::error::CheckoutError;
use crate::order::OrderDraft;
use crate::workflow::{ContextData, Pipeline, PipelineControl, StepPolicy};

pub const STEP_AUTHENTICATE: &str = "authenticate";
pub const STEP_VALIDATE: &str = "validate_payload";
pub const STEP_PRICE: &str = "price_items";
pub const STEP_PERSIST: &str = "persist_order";
pub const STEP_GATEWAY_ORDER: &str = "create_gateway_order";
pub const STEP_RECORD_REF: &str = "record_provider_ref";
pub const STEP_CLEAR_CART: &str = "clear_cart";
pub const STEP_RESPOND: &str = "respond";

pub fn build_checkout_pipeline() -> Pipeline<CheckoutCtxData, CheckoutError> {
  let mut p = Pipeline::<CheckoutCtxData, CheckoutError>::new(&[
    (STEP_AUTHENTICATE, StepPolicy::Required),
    (STEP_VALIDATE, StepPolicy::Required),
    (STEP_PRICE, StepPolicy::Required),
    (STEP_PERSIST, StepPolicy::Required),
    (STEP_GATEWAY_ORDER, StepPolicy::Required),
    (STEP_RECORD_REF, StepPolicy::Required),
    (STEP_CLEAR_CART, StepPolicy::BestEffort),
    (STEP_RESPOND, StepPolicy::Required),
  ]);

  p.on_root(STEP_AUTHENTICATE, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let user_id = require_principal(guard.principal.as_ref())?.user_id.clone();
      guard.user_id = Some(user_id);
      Ok::<_, CheckoutError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_VALIDATE, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      guard.request.validate()?;
      guard.stage = CheckoutStage::Validated;
      Ok::<_, CheckoutError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_PRICE, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (pricing, items) = {
        let guard = ctx_data.read();
        (guard.deps.pricing.clone(), guard.request.items.clone())
      };
      let priced = pricing.compute_amount(&items).await?;
      let mut guard = ctx_data.write();
      guard.pricing = Some(priced);
      guard.stage = CheckoutStage::Priced;
      Ok::<_, CheckoutError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_PERSIST, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (ledger, draft) = {
        let guard = ctx_data.read();
        let user_id = expect_set(&guard.user_id, STEP_PERSIST, "user id")?;
        let pricing = expect_set(&guard.pricing, STEP_PERSIST, "pricing")?;
        let draft = OrderDraft::new(
          user_id,
          guard.request.items.clone(),
          pricing.total,
          guard.request.address.trim(),
        );
        (guard.deps.ledger.clone(), draft)
      };
      let order = ledger.create(draft).await?;
      let mut guard = ctx_data.write();
      guard.order = Some(order);
      guard.stage = CheckoutStage::Persisted;
      Ok::<_, CheckoutError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_GATEWAY_ORDER, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (gateway, order) = {
        let guard = ctx_data.read();
        (guard.deps.gateway.clone(), expect_set(&guard.order, STEP_GATEWAY_ORDER, "order")?)
      };
      let provider_order = gateway.create_provider_order(&order).await.map_err(|e| {
        warn!(order_id = %order.order_id, "Order kept as PLACED/PENDING after gateway failure.");
        match e {
          CheckoutError::Gateway(reason) => CheckoutError::GatewayPending {
            order_id: order.order_id.clone(),
            reason,
          },
          other => other,
        }
      })?;
      let mut guard = ctx_data.write();
      guard.provider_order = Some(provider_order);
      guard.stage = CheckoutStage::GatewayOrdered;
      Ok::<_, CheckoutError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_RECORD_REF, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (ledger, order, provider_order) = {
        let guard = ctx_data.read();
        (
          guard.deps.ledger.clone(),
          expect_set(&guard.order, STEP_RECORD_REF, "order")?,
          expect_set(&guard.provider_order, STEP_RECORD_REF, "provider order")?,
        )
      };
      let updated = ledger
        .attach_provider_ref(&order.order_id, &provider_order.id)
        .await
        .inspect_err(|e| {
          warn!(order_id = %order.order_id, provider_ref = %provider_order.id, error = %e, "Provider order exists but its reference was not recorded.");
        })?;
      ctx_data.write().order = Some(updated);
      Ok::<_, CheckoutError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_CLEAR_CART, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (carts, user_id) = {
        let guard = ctx_data.read();
        (guard.deps.carts.clone(), expect_set(&guard.user_id, STEP_CLEAR_CART, "user id")?)
      };
      carts.clear(&user_id).await?;
      ctx_data.write().cart_cleared = true;
      Ok::<_, CheckoutError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_RESPOND, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let order = expect_set(&guard.order, STEP_RESPOND, "order")?;
      let provider_order = expect_set(&guard.provider_order, STEP_RESPOND, "provider order")?;
      let payment = guard.deps.gateway.payment_init(&provider_order);
      let cart_cleared = guard.cart_cleared;
      guard.stage = CheckoutStage::Responded;
      guard.outcome = Some(CheckoutOutcome {
        order: order.summary(),
        payment,
        stage: CheckoutStage::Responded,
        cart_cleared,
      });
      info!(order_id = %order.order_id, provider_ref = %provider_order.id, "Order placed.");
      Ok::<_, CheckoutError>(PipelineControl::Continue)
    })
  });

  p
}
