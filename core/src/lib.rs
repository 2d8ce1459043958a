// src/lib.rs

//! storefront-core: order ledger, pricing, payment gateway adapter and
//! payment verification for a storefront checkout.
//!
//! Order creation runs as a small async step pipeline (`workflow`):
//!  - Named steps, each `Required` or `BestEffort`, with `on`/`after` handlers.
//!  - Shared per-run state behind `ContextData<T>`.
//!  - Early stop from any handler; required-step failures end the run with
//!    the handler's own error type.
//!
//! Storage, price lookup, the payment provider and carts sit behind async
//! traits so the same services run against PostgreSQL and a real provider in
//! the app, and against in-memory doubles in tests.

pub mod access;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod order;
pub mod order_id;
pub mod pricing;
pub mod verification;
pub mod workflow;

// --- Re-exports for the Public API ---

pub use crate::workflow::{ContextData, Handler, Pipeline, PipelineControl, PipelineOutcome, PipelineResult, StepDef, StepPolicy};

pub use crate::error::{CheckoutError, CheckoutResult, FlowError};

pub use crate::access::{require_principal, Principal, SellerAccess};
pub use crate::cart::{CartStore, MemoryCartStore};
pub use crate::checkout::{CheckoutDeps, CheckoutOutcome, CheckoutRequest, CheckoutService, CheckoutStage};
pub use crate::gateway::{to_minor_units, PaymentGateway, PaymentGatewayAdapter, PaymentInit, ProviderOrder, ProviderOrderRequest};
pub use crate::ledger::{BackfillReport, MemoryOrderStore, OrderLedger, OrderStore};
pub use crate::order::{LineItem, Order, OrderDraft, OrderStatus, OrderSummary, PaymentStatus, StatusUpdate};
pub use crate::order_id::{generate_order_id, OrderIdGenerator};
pub use crate::pricing::{apply_surcharge, PriceLookup, Pricing, PricingCalculator, StaticPriceList};
pub use crate::verification::{PaymentCallback, PaymentSignature, PaymentVerifier};
