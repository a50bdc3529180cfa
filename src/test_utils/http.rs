use axum::{
    body::Body,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use serde::de::DeserializeOwned;
use time::{Duration, OffsetDateTime};

use crate::{UserID, auth::set_session_cookie};

#[track_caller]
pub(crate) fn assert_status(response: &Response<Body>, status: StatusCode) {
    assert_eq!(
        response.status(),
        status,
        "got status {}, want {status}",
        response.status()
    );
}

pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read response body");

    serde_json::from_slice(&body).expect("Response body is not the expected JSON")
}

/// The `name=value` pair of a valid session cookie for `user_id`.
pub(crate) fn session_cookie(key: &Key, user_id: UserID) -> String {
    let jar = set_session_cookie(
        PrivateCookieJar::new(key.clone()),
        user_id,
        OffsetDateTime::now_utc() + Duration::minutes(5),
    )
    .expect("Could not set session cookie");

    let response = jar.into_response();
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("Cookie jar did not set a cookie")
        .to_str()
        .expect("Could not convert cookie header to str");

    set_cookie
        .split(';')
        .next()
        .expect("Cookie header is empty")
        .to_owned()
}
