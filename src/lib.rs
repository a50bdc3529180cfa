//! Tally is a web service for tracking personal and shared finances.
//!
//! Users record income and expenses against categories, banking accounts and
//! credit cards, optionally share them with a team, and read back running
//! month and year rollups. Credit card purchases accumulate into invoices that
//! are settled by hand or by a daily automatic-debit sweep, and recurring
//! transactions fire on a fixed day or a business day of the month.
//!
//! This library provides a JSON API over a SQLite database.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod calendar;
mod category;
mod database_id;
mod db;
mod endpoints;
mod history;
mod invoice;
mod logging;
mod recurring;
mod routing;
mod scheduler;
mod statistics;
mod team;
#[cfg(test)]
mod test_utils;
mod timezone;
mod transaction;
mod user;

pub use account::{AccountForm, BankingAccount, create_account};
pub use app_state::AppState;
pub use auth::set_session_cookie;
pub use calendar::{business_day_count, is_last_business_day};
pub use category::create_category;
pub use db::initialize as initialize_db;
pub use invoice::{
    InvoiceDates, InvoiceStatus, SweptInvoice, invoice_status, pay_invoice,
    sweep_automatic_debits, try_acquire_daily_slot,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use recurring::{RecurrenceRun, RecurrenceTrigger, run_daily_recurrences};
pub use routing::build_router;
pub use timezone::get_local_offset;
pub use transaction::{PaymentMethod, Transaction, TransactionType, record_transaction};
pub use user::{UserID, create_user};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// Amounts are stored in cents and must be strictly positive. Whether the
    /// money came in or went out is given by the transaction type.
    #[error("amount must be a positive number of cents, got {0}")]
    InvalidAmount(i64),

    /// A pay day, close day or recurrence day outside of 1-31.
    #[error("{0} is not a valid day of the month")]
    InvalidDay(u8),

    /// A recurrence trigger that can never fire, e.g. the 30th business day.
    #[error("invalid recurrence trigger: {0}")]
    InvalidTrigger(String),

    /// The payment method does not make sense for the transaction.
    #[error("invalid payment: {0}")]
    InvalidPayment(&'static str),

    /// Team member percentages must add up to no more than 100.
    #[error("team percentages must add up to at most 100, got {0}")]
    InvalidPercentage(u32),

    /// A date could not be constructed, e.g. the year is out of range.
    #[error("the date {0} is out of range")]
    DateOutOfRange(String),

    /// An empty string was used for a name.
    #[error("name cannot be empty")]
    EmptyName,

    /// The category named in a transaction does not exist for the user.
    #[error("could not find the category \"{0}\"")]
    CategoryNotFound(String),

    /// The invoice does not exist or belongs to another user.
    #[error("the invoice could not be found")]
    InvoiceNotFound,

    /// The banking account does not exist or belongs to another user.
    #[error("the banking account could not be found")]
    AccountNotFound,

    /// The recurring transaction does not exist or belongs to another user.
    #[error("the recurring transaction could not be found")]
    TemplateNotFound,

    /// The team does not exist or the user is not one of its members.
    #[error("the team could not be found")]
    TeamNotFound,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The invoice has already been settled.
    ///
    /// Paying twice must be rejected rather than silently debiting the account
    /// a second time.
    #[error("the invoice has already been paid")]
    AlreadyPaid,

    /// The automatic debit sweep has already run today.
    #[error("automatic debits have already been processed today")]
    AlreadySweptToday,

    /// The user already has a category with this name.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The user already has an account with this name.
    #[error("the account \"{0}\" already exists")]
    DuplicateAccountName(String),

    /// The user is already part of the team.
    #[error("the user is already a member of the team")]
    DuplicateTeamMember,

    /// The request did not carry a valid session or scheduler token.
    #[error("you must be logged in to do that")]
    Unauthenticated,

    /// The user is logged in but may not perform the action.
    #[error("you are not allowed to do that")]
    Forbidden,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A request or response body could not be read.
    #[error("could not read the message body")]
    BodyReadError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body sent to clients when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidAmount(_)
            | Error::InvalidDay(_)
            | Error::InvalidTrigger(_)
            | Error::InvalidPayment(_)
            | Error::InvalidPercentage(_)
            | Error::DateOutOfRange(_)
            | Error::EmptyName => StatusCode::BAD_REQUEST,
            Error::CategoryNotFound(_)
            | Error::InvoiceNotFound
            | Error::AccountNotFound
            | Error::TemplateNotFound
            | Error::TeamNotFound
            | Error::NotFound => StatusCode::NOT_FOUND,
            Error::AlreadyPaid
            | Error::AlreadySweptToday
            | Error::DuplicateCategoryName(_)
            | Error::DuplicateAccountName(_)
            | Error::DuplicateTeamMember => StatusCode::CONFLICT,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::InvalidTimezoneError(_)
            | Error::DatabaseLockError
            | Error::BodyReadError
            | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server side failures are logged, the details are not for the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
