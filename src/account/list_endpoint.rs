//! Defines the endpoint for listing the user's banking accounts.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    account::{BankingAccount, get_accounts},
};

/// The state needed to list accounts.
#[derive(Debug, Clone)]
pub struct ListAccountsState {
    /// The database connection for reading accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListAccountsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the user's accounts with their balances.
pub async fn get_accounts_endpoint(
    State(state): State<ListAccountsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<BankingAccount>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_accounts(user_id, &connection).map(Json)
}
