//! Request authentication
//!
//! Auth is expressed as the [`AuthConfig`] sum type and rendered into an
//! `Authorization` header. An explicit `Authorization` header on the request
//! always wins; the lookup is case-insensitive.

mod basic;
mod bearer;

pub use basic::BasicAuth;
pub use bearer::BearerAuth;

use indexmap::IndexMap;

use crate::models::AuthConfig;

pub const AUTHORIZATION: &str = "Authorization";

/// Header value for `auth`, or `None` when no auth is configured
pub fn authorization_value(auth: &AuthConfig) -> Option<String> {
    match auth {
        AuthConfig::None => None,
        AuthConfig::Basic { username, password } => {
            Some(BasicAuth::new(username, password).header_value())
        }
        AuthConfig::BearerToken { token } if token.is_empty() => None,
        AuthConfig::BearerToken { token } => Some(BearerAuth::new(token).header_value()),
    }
}

/// Add the auth header unless the request already carries one
pub fn apply_auth(auth: &AuthConfig, headers: &mut IndexMap<String, String>) {
    if headers.keys().any(|k| k.eq_ignore_ascii_case(AUTHORIZATION)) {
        return;
    }
    if let Some(value) = authorization_value(auth) {
        headers.insert(AUTHORIZATION.to_string(), value);
    }
}
