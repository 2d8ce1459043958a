// storefront/src/web/extractors.rs

//! Caller identity as forwarded by the upstream authenticator in the
//! `X-User-ID` and `X-User-Email` headers.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use storefront_core::{require_principal, Principal};
use tracing::warn;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
  req
    .headers()
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_string)
}

fn principal_from_headers(req: &HttpRequest) -> Option<Principal> {
  let user_id = header_value(req, USER_ID_HEADER)?;
  let principal = Principal::new(user_id);
  Some(match header_value(req, USER_EMAIL_HEADER) {
    Some(email) => principal.with_email(email),
    None => principal,
  })
}

/// The caller, if any. Never rejects; the checkout run decides what an
/// anonymous caller gets.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

impl FromRequest for MaybePrincipal {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(Ok(MaybePrincipal(principal_from_headers(req))))
  }
}

/// A caller with a non-empty user id; anything else is rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let principal = principal_from_headers(req);
    ready(match require_principal(principal.as_ref()) {
      Ok(p) => Ok(AuthenticatedUser(p.clone())),
      Err(e) => {
        warn!(path = %req.path(), "Request without a forwarded user id.");
        Err(e.into())
      }
    })
  }
}
