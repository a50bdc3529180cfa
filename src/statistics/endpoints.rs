//! Route handlers for the statistics read models.
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, UserID,
    history::{MonthHistory, YearHistory, get_month_history, get_year_history},
    statistics::{BalanceSummary, CategoryTotal, get_balance_summary, get_category_breakdown},
};

/// The state needed to read statistics.
#[derive(Debug, Clone)]
pub struct StatisticsState {
    /// The database connection for reading statistics.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for StatisticsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Query parameters selecting a month.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthQuery {
    /// The year.
    pub year: i32,
    /// The zero-based month.
    pub month: u8,
}

/// Query parameters selecting a year.
#[derive(Debug, Clone, Deserialize)]
pub struct YearQuery {
    /// The year.
    pub year: i32,
}

fn validate_month(month: u8) -> Result<u8, Error> {
    if month > 11 {
        return Err(Error::DateOutOfRange(format!("month {month}")));
    }

    Ok(month)
}

fn lock(state: &StatisticsState) -> Result<MutexGuard<'_, Connection>, Error> {
    state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// A route handler for the per-day totals of a month.
pub async fn get_month_history_endpoint(
    State(state): State<StatisticsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<MonthHistory>>, Error> {
    let month = validate_month(query.month)?;
    let connection = lock(&state)?;

    get_month_history(user_id, query.year, month, &connection).map(Json)
}

/// A route handler for the per-month totals of a year.
pub async fn get_year_history_endpoint(
    State(state): State<StatisticsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<YearQuery>,
) -> Result<Json<Vec<YearHistory>>, Error> {
    let connection = lock(&state)?;

    get_year_history(user_id, query.year, &connection).map(Json)
}

/// A route handler for a month's totals per category.
pub async fn get_category_breakdown_endpoint(
    State(state): State<StatisticsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<CategoryTotal>>, Error> {
    let month = validate_month(query.month)?;
    let connection = lock(&state)?;

    get_category_breakdown(user_id, query.year, month, &connection).map(Json)
}

/// A route handler for the account balance and a month's cash flow.
pub async fn get_balance_summary_endpoint(
    State(state): State<StatisticsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<BalanceSummary>, Error> {
    let month = validate_month(query.month)?;
    let connection = lock(&state)?;

    get_balance_summary(user_id, query.year, month, &connection).map(Json)
}
