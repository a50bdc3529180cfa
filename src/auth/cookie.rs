//! Reads and writes the encrypted session cookie issued for a logged in user.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::OffsetDateTime;

use crate::{Error, UserID, auth::Token};

/// The name of the cookie holding the session [Token].
pub(crate) const COOKIE_TOKEN: &str = "session";

/// Add a session cookie for `user_id` that expires at `expires_at`.
///
/// The identity provider normally issues this cookie. It is exposed so that
/// provisioning scripts and tests can mint sessions with the same key.
///
/// # Errors
///
/// Returns [Error::Unauthenticated] if the token cannot be serialised.
pub fn set_session_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    expires_at: OffsetDateTime,
) -> Result<PrivateCookieJar, Error> {
    let token = Token {
        user_id,
        expires_at,
    };
    let token_string = serde_json::to_string(&token).map_err(|error| {
        tracing::error!("Could not serialise session token: {error}");
        Error::Unauthenticated
    })?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, token_string))
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Get the session token from `jar`, rejecting tokens that have expired.
///
/// # Errors
///
/// Returns [Error::Unauthenticated] if the cookie is missing, cannot be
/// decrypted into a token, or has expired.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::Unauthenticated)?;

    let token: Token = serde_json::from_str(cookie.value_trimmed()).map_err(|error| {
        tracing::debug!("Could not parse session token: {error}");
        Error::Unauthenticated
    })?;

    if token.expires_at <= OffsetDateTime::now_utc() {
        tracing::debug!("Session for user {} expired at {}", token.user_id, token.expires_at);
        return Err(Error::Unauthenticated);
    }

    Ok(token)
}

/// Get the ID of the logged in user from the session cookie in `jar`.
///
/// # Errors
///
/// Returns [Error::Unauthenticated] if there is no valid session.
pub(crate) fn get_user_id_from_cookies(jar: &PrivateCookieJar) -> Result<UserID, Error> {
    get_token_from_cookies(jar).map(|token| token.user_id)
}
