//! Session handling for the JSON API.
//!
//! Users log in with the external identity provider, which issues an encrypted
//! session cookie. This module decrypts that cookie to find out who is making
//! a request.

mod cookie;
mod middleware;
mod token;

pub use cookie::set_session_cookie;
pub use middleware::{AuthState, auth_guard};
pub(super) use token::Token;

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
