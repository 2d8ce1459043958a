// storefront-core/src/access.rs

//! Who is calling, and whether they may use seller-only operations.

use std::collections::HashSet;
use tracing::warn;

use crate::error::{CheckoutError, CheckoutResult};

/// Identity forwarded by the upstream authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
  pub user_id: String,
  pub email: Option<String>,
}

impl Principal {
  pub fn new(user_id: impl Into<String>) -> Self {
    Self {
      user_id: user_id.into(),
      email: None,
    }
  }

  pub fn with_email(mut self, email: impl Into<String>) -> Self {
    self.email = Some(email.into());
    self
  }
}

/// Requires a principal with a non-blank user id.
pub fn require_principal(principal: Option<&Principal>) -> CheckoutResult<&Principal> {
  match principal {
    Some(p) if !p.user_id.trim().is_empty() => Ok(p),
    _ => Err(CheckoutError::Unauthenticated("login required".to_string())),
  }
}

/// Email allow-list for seller endpoints. An empty list denies everyone.
#[derive(Debug, Clone, Default)]
pub struct SellerAccess {
  allowed: HashSet<String>,
}

impl SellerAccess {
  pub fn new<I, S>(emails: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let allowed = emails
      .into_iter()
      .map(|e| e.as_ref().trim().to_ascii_lowercase())
      .filter(|e| !e.is_empty())
      .collect();
    Self { allowed }
  }

  /// Parses a comma separated list such as `SELLER_EMAILS`.
  pub fn from_csv(list: &str) -> Self {
    Self::new(list.split(','))
  }

  pub fn is_empty(&self) -> bool {
    self.allowed.is_empty()
  }

  pub fn authorize<'a>(&self, principal: Option<&'a Principal>) -> CheckoutResult<&'a Principal> {
    let principal = require_principal(principal)?;
    let email = principal
      .email
      .as_deref()
      .map(|e| e.trim().to_ascii_lowercase())
      .unwrap_or_default();
    if email.is_empty() || !self.allowed.contains(&email) {
      warn!(user_id = %principal.user_id, "Seller access denied.");
      return Err(CheckoutError::Forbidden("seller access required".to_string()));
    }
    Ok(principal)
  }
}
