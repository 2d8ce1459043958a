// storefront-core/src/pricing.rs

//! Turns line items into the amount the customer is charged.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{CheckoutError, CheckoutResult};
use crate::order::LineItem;

/// Processing surcharge applied on top of the item subtotal, in percent.
pub const SURCHARGE_PERCENT: u32 = 2;

/// Current unit price of a product, or `None` if the product does not exist.
#[async_trait]
pub trait PriceLookup: Send + Sync {
  async fn unit_price(&self, product: &str) -> CheckoutResult<Option<Decimal>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pricing {
  pub subtotal: Decimal,
  pub surcharge: Decimal,
  pub total: Decimal,
}

/// `surcharge = floor(subtotal * 2%)`, in whole currency units.
pub fn apply_surcharge(subtotal: Decimal) -> Pricing {
  let surcharge = (subtotal * Decimal::new(SURCHARGE_PERCENT as i64, 2)).floor();
  Pricing {
    subtotal,
    surcharge,
    total: subtotal + surcharge,
  }
}

#[derive(Clone)]
pub struct PricingCalculator {
  prices: Arc<dyn PriceLookup>,
  lookup_timeout: Option<Duration>,
}

impl PricingCalculator {
  pub fn new(prices: Arc<dyn PriceLookup>) -> Self {
    Self {
      prices,
      lookup_timeout: None,
    }
  }

  /// Bounds every single price lookup. A lookup that times out counts as a missing product.
  pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
    self.lookup_timeout = Some(timeout);
    self
  }

  async fn unit_price(&self, product: &str) -> CheckoutResult<Decimal> {
    let lookup = self.prices.unit_price(product);
    let price = match self.lookup_timeout {
      Some(limit) => tokio::time::timeout(limit, lookup).await.map_err(|_| {
        warn!(%product, timeout_ms = limit.as_millis() as u64, "Price lookup timed out.");
        CheckoutError::NotFound(format!("Product not found: {} (price lookup timed out)", product))
      })??,
      None => lookup.await?,
    };
    price.ok_or_else(|| CheckoutError::NotFound(format!("Product not found: {}", product)))
  }

  /// Prices every item or none: the first unresolvable product aborts the computation.
  #[instrument(name = "PricingCalculator::compute_amount", skip(self, items), fields(items = items.len()), err(Display))]
  pub async fn compute_amount(&self, items: &[LineItem]) -> CheckoutResult<Pricing> {
    let mut subtotal = Decimal::ZERO;
    for item in items {
      let unit_price = self.unit_price(&item.product).await?;
      subtotal += unit_price * Decimal::from(item.quantity);
    }
    let pricing = apply_surcharge(subtotal);
    debug!(subtotal = %pricing.subtotal, surcharge = %pricing.surcharge, total = %pricing.total, "Order priced.");
    Ok(pricing)
  }
}

/// Fixed price list, e.g. for tests or a seeded catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceList {
  prices: std::collections::HashMap<String, Decimal>,
}

impl StaticPriceList {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_price(mut self, product: impl Into<String>, price: Decimal) -> Self {
    self.prices.insert(product.into(), price);
    self
  }
}

#[async_trait]
impl PriceLookup for StaticPriceList {
  async fn unit_price(&self, product: &str) -> CheckoutResult<Option<Decimal>> {
    Ok(self.prices.get(product).copied())
  }
}
