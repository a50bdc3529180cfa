//! Route handlers for managing recurring transactions.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    database_id::RecurringId,
    recurring::{
        RecurringForm, RecurringTransaction, create_recurring_transaction,
        delete_recurring_transaction, get_recurring_transactions,
    },
};

/// The state needed to manage recurring transactions.
#[derive(Debug, Clone)]
pub struct RecurringState {
    /// The database connection for managing recurring transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RecurringState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a recurring transaction, responds with the template.
pub async fn create_recurring_endpoint(
    State(state): State<RecurringState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<RecurringForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_recurring_transaction(user_id, &form, &connection) {
        Ok(template) => (StatusCode::CREATED, Json(template)).into_response(),
        Err(error) => {
            tracing::warn!("Could not create recurring transaction {form:?}: {error}");
            error.into_response()
        }
    }
}

/// A route handler for listing the user's recurring transactions.
pub async fn get_recurring_endpoint(
    State(state): State<RecurringState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<RecurringTransaction>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_recurring_transactions(user_id, &connection).map(Json)
}

/// A route handler for deleting one of the user's recurring transactions.
pub async fn delete_recurring_endpoint(
    State(state): State<RecurringState>,
    Extension(user_id): Extension<UserID>,
    Path(recurring_id): Path<RecurringId>,
) -> Result<StatusCode, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_recurring_transaction(recurring_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
