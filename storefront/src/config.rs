// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use secrecy::SecretString;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProviderKind {
  Razorpay,
  Mock,
}

impl PaymentProviderKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentProviderKind::Razorpay => "razorpay",
      PaymentProviderKind::Mock => "mock",
    }
  }
}

impl FromStr for PaymentProviderKind {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "razorpay" => Ok(PaymentProviderKind::Razorpay),
      "mock" => Ok(PaymentProviderKind::Mock),
      other => Err(AppError::Config(format!(
        "Invalid PAYMENT_PROVIDER '{}': expected 'razorpay' or 'mock'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub db_max_connections: u32,
  pub apply_schema: bool,

  pub payment_provider: PaymentProviderKind,
  pub payment_key_id: String,
  pub payment_key_secret: SecretString,
  pub payment_api_base: String,
  pub currency: String,
  pub gateway_timeout: Duration,
  pub price_lookup_timeout: Duration,

  /// Comma separated allow-list for seller endpoints. Empty denies everyone.
  pub seller_emails: String,
}

fn parse_var<T: FromStr>(name: &str, raw: String) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |name: &str| {
      lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", name)))
    };
    let or_default = |name: &str, default: &str| get_env(name).unwrap_or_else(|_| default.to_string());

    let server_host = or_default("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var("SERVER_PORT", or_default("SERVER_PORT", "8080"))?;
    let database_url = get_env("DATABASE_URL")?;
    let db_max_connections = parse_var("DB_MAX_CONNECTIONS", or_default("DB_MAX_CONNECTIONS", "5"))?;
    let apply_schema = parse_var("APPLY_SCHEMA", or_default("APPLY_SCHEMA", "false"))?;

    let payment_provider: PaymentProviderKind = or_default("PAYMENT_PROVIDER", "mock").parse()?;
    let payment_key_id = get_env("PAYMENT_KEY_ID")?;
    let payment_key_secret = SecretString::from(get_env("PAYMENT_KEY_SECRET")?);
    let payment_api_base = or_default("PAYMENT_API_BASE", "https://api.razorpay.com")
      .trim_end_matches('/')
      .to_string();
    let currency = or_default("CURRENCY", "INR").to_ascii_uppercase();
    let gateway_timeout =
      Duration::from_millis(parse_var("GATEWAY_TIMEOUT_MS", or_default("GATEWAY_TIMEOUT_MS", "10000"))?);
    let price_lookup_timeout = Duration::from_millis(parse_var(
      "PRICE_LOOKUP_TIMEOUT_MS",
      or_default("PRICE_LOOKUP_TIMEOUT_MS", "3000"),
    )?);
    let seller_emails = lookup("SELLER_EMAILS").unwrap_or_default();

    if db_max_connections == 0 {
      return Err(AppError::Config("DB_MAX_CONNECTIONS must be at least 1".to_string()));
    }

    tracing::info!(
      provider = ?payment_provider,
      %currency,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      db_max_connections,
      apply_schema,
      payment_provider,
      payment_key_id,
      payment_key_secret,
      payment_api_base,
      currency,
      gateway_timeout,
      price_lookup_timeout,
      seller_emails,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use secrecy::ExposeSecret;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name: &str| vars.get(name).cloned()
  }

  const REQUIRED: [(&str, &str); 3] = [
    ("DATABASE_URL", "postgres://localhost/shop"),
    ("PAYMENT_KEY_ID", "rzp_test_key"),
    ("PAYMENT_KEY_SECRET", "s3cret"),
  ];

  #[test]
  fn test_defaults() {
    let cfg = AppConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
    assert_eq!(cfg.server_host, "127.0.0.1");
    assert_eq!(cfg.server_port, 8080);
    assert_eq!(cfg.payment_provider, PaymentProviderKind::Mock);
    assert_eq!(cfg.payment_api_base, "https://api.razorpay.com");
    assert_eq!(cfg.currency, "INR");
    assert_eq!(cfg.gateway_timeout, Duration::from_millis(10_000));
    assert_eq!(cfg.price_lookup_timeout, Duration::from_millis(3_000));
    assert_eq!(cfg.db_max_connections, 5);
    assert!(!cfg.apply_schema);
    assert!(cfg.seller_emails.is_empty());
    assert_eq!(cfg.payment_key_secret.expose_secret(), "s3cret");
  }

  #[test]
  fn test_missing_secret_is_config_error() {
    let err = AppConfig::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
    assert!(matches!(err, AppError::Config(msg) if msg.contains("PAYMENT_KEY_SECRET")));
  }

  #[test]
  fn test_invalid_values_are_config_errors() {
    let mut vars = REQUIRED.to_vec();
    vars.push(("SERVER_PORT", "eighty"));
    assert!(matches!(AppConfig::from_lookup(lookup_from(&vars)), Err(AppError::Config(_))));

    let mut vars = REQUIRED.to_vec();
    vars.push(("PAYMENT_PROVIDER", "paypal"));
    assert!(matches!(AppConfig::from_lookup(lookup_from(&vars)), Err(AppError::Config(_))));
  }

  #[test]
  fn test_debug_does_not_leak_secret() {
    let cfg = AppConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
    assert!(!format!("{:?}", cfg).contains("s3cret"));
  }
}
