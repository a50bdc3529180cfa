//! Route handlers called once a day by the external scheduler.
//!
//! The jobs are guarded by a shared bearer token instead of a user session,
//! and "today" is the date in the configured local timezone.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    invoice::{SweptInvoice, sweep_automatic_debits},
    recurring::{RecurrenceRun, run_daily_recurrences},
    timezone::now_local,
};

/// The state needed by the bearer token guard.
#[derive(Debug, Clone)]
pub struct SchedulerGuardState {
    /// The token the scheduler sends as `Authorization: Bearer <token>`.
    pub scheduler_token: String,
}

impl FromRef<AppState> for SchedulerGuardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            scheduler_token: state.scheduler_token.clone(),
        }
    }
}

/// Middleware that only lets through requests carrying the scheduler token.
pub async fn scheduler_guard(
    State(state): State<SchedulerGuardState>,
    authorization: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Response {
    match authorization {
        Some(TypedHeader(Authorization(bearer))) if bearer.token() == state.scheduler_token => {
            next.run(request).await
        }
        Some(_) => {
            tracing::warn!("Rejected scheduler request with the wrong token");
            Error::Unauthenticated.into_response()
        }
        None => Error::Unauthenticated.into_response(),
    }
}

/// The state needed to run the daily jobs.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
    /// The database connection for running the jobs.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SchedulerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that fires today's recurring transactions.
pub async fn run_recurring_endpoint(
    State(state): State<SchedulerState>,
) -> Result<Json<RecurrenceRun>, Error> {
    let today = now_local(&state.local_timezone)?.date();
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let run = run_daily_recurrences(today, &connection)?;
    tracing::info!(
        "Recurring transactions for {today}: {} fired, {} failed",
        run.fired.len(),
        run.failures.len()
    );

    Ok(Json(run))
}

/// A route handler that pays the automatic-debit invoices due today.
///
/// Responds with [Error::AlreadySweptToday] if the sweep already ran today.
pub async fn sweep_automatic_debits_endpoint(
    State(state): State<SchedulerState>,
) -> Result<Json<Vec<SweptInvoice>>, Error> {
    let now = now_local(&state.local_timezone)?;
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    sweep_automatic_debits(now.date(), now, &connection).map(Json)
}
