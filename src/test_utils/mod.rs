#![allow(missing_docs)]

pub(crate) mod fixtures;
pub(crate) mod http;

pub(crate) use fixtures::{
    get_test_connection, must_create_account, must_create_category, must_create_user,
};
pub(crate) use http::{assert_status, parse_json, session_cookie};
