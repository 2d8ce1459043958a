// storefront/src/state.rs
use crate::config::AppConfig;
use crate::db::{PgCartStore, PgOrderStore, PgPriceCatalog};
use sqlx::PgPool;
use std::sync::Arc;
use storefront_core::{
  CartStore, CheckoutDeps, CheckoutService, OrderLedger, OrderStore, PaymentGateway, PaymentGatewayAdapter,
  PaymentSignature, PaymentVerifier, PriceLookup, PricingCalculator, SellerAccess,
};

/// Storage and provider ports the services are wired against.
pub struct Backends {
  pub orders: Arc<dyn OrderStore>,
  pub prices: Arc<dyn PriceLookup>,
  pub carts: Arc<dyn CartStore>,
  pub gateway: Arc<dyn PaymentGateway>,
}

impl Backends {
  pub fn postgres(pool: PgPool, gateway: Arc<dyn PaymentGateway>) -> Self {
    Self {
      orders: Arc::new(PgOrderStore::new(pool.clone())),
      prices: Arc::new(PgPriceCatalog::new(pool.clone())),
      carts: Arc::new(PgCartStore::new(pool)),
      gateway,
    }
  }
}

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub checkout: CheckoutService,
  pub verifier: PaymentVerifier,
  pub ledger: Arc<OrderLedger>,
  pub carts: Arc<dyn CartStore>,
  pub sellers: Arc<SellerAccess>,
}

impl AppState {
  pub fn new(config: Arc<AppConfig>, backends: Backends) -> Self {
    let ledger = Arc::new(OrderLedger::new(backends.orders));
    let pricing = PricingCalculator::new(backends.prices).with_lookup_timeout(config.price_lookup_timeout);
    let gateway = PaymentGatewayAdapter::new(
      backends.gateway,
      config.currency.clone(),
      config.payment_key_id.clone(),
    )
    .with_timeout(config.gateway_timeout);

    let checkout = CheckoutService::new(CheckoutDeps {
      ledger: ledger.clone(),
      pricing,
      gateway,
      carts: backends.carts.clone(),
    });
    let verifier = PaymentVerifier::new(
      ledger.clone(),
      PaymentSignature::new(config.payment_key_secret.clone()),
    );
    let sellers = Arc::new(SellerAccess::from_csv(&config.seller_emails));
    if sellers.is_empty() {
      tracing::warn!("SELLER_EMAILS is empty; seller endpoints will deny every request.");
    }

    Self {
      config,
      checkout,
      verifier,
      ledger,
      carts: backends.carts,
      sellers,
    }
  }
}
