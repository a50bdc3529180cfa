//! Defines the endpoint for creating a new banking account.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, UserID,
    account::{BankingAccount, core::ACCOUNT_COLUMNS, map_row_to_account},
};

/// The state needed to create an account.
#[derive(Debug, Clone)]
pub struct CreateAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountForm {
    /// The account name.
    pub name: String,
    /// The opening balance in cents.
    #[serde(default)]
    pub balance: i64,
    /// The day of the month the credit card invoice is due.
    pub pay_day: u8,
    /// The day of the month the credit card invoice closes.
    pub close_day: u8,
    /// Whether invoices should be paid automatically on the pay day.
    #[serde(default)]
    pub automatic_debit_invoices: bool,
}

/// A route handler for creating a new account, responds with the created account.
pub async fn create_account_endpoint(
    State(state): State<CreateAccountState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<AccountForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_account(user_id, &form, &connection) {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(error) => {
            tracing::warn!("Could not create account with {form:?}: {error}");
            error.into_response()
        }
    }
}

/// Create a banking account for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the name is blank,
/// - [Error::InvalidDay] if the pay day or close day is not in 1-31,
/// - [Error::DuplicateAccountName] if the user already has an account with the name,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_account(
    user_id: UserID,
    form: &AccountForm,
    connection: &Connection,
) -> Result<BankingAccount, Error> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    for day in [form.pay_day, form.close_day] {
        if !(1..=31).contains(&day) {
            return Err(Error::InvalidDay(day));
        }
    }

    connection
        .prepare(&format!(
            "INSERT INTO banking_account
                (user_id, name, balance, pay_day, close_day, automatic_debit_invoices)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {ACCOUNT_COLUMNS}"
        ))?
        .query_row(
            (
                user_id,
                name,
                form.balance,
                form.pay_day,
                form.close_day,
                form.automatic_debit_invoices,
            ),
            map_row_to_account,
        )
        .map_err(|error| match error {
            // Handle unique account name constraint violation
            rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 2067 => {
                Error::DuplicateAccountName(name.to_owned())
            }
            error => error.into(),
        })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Json, extract::State, http::StatusCode};

    use crate::{
        Error,
        account::{
            BankingAccount, create_account, create_account_endpoint,
            create_endpoint::{AccountForm, CreateAccountState},
            get_account,
        },
        test_utils::{assert_status, get_test_connection, must_create_user, parse_json},
    };

    fn form(name: &str, pay_day: u8, close_day: u8) -> AccountForm {
        AccountForm {
            name: name.to_owned(),
            balance: 12_345,
            pay_day,
            close_day,
            automatic_debit_invoices: true,
        }
    }

    #[tokio::test]
    async fn can_create_account() {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);
        let state = CreateAccountState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = create_account_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(form("Visa", 5, 20)),
        )
        .await;

        assert_status(&response, StatusCode::CREATED);
        let got: BankingAccount = parse_json(response).await;
        let want = BankingAccount {
            id: 1,
            user_id,
            name: "Visa".to_owned(),
            balance: 12_345,
            pay_day: 5,
            close_day: 20,
            automatic_debit_invoices: true,
        };
        assert_eq!(got, want);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_account(1, user_id, &connection), Ok(want));
    }

    #[test]
    fn rejects_invalid_days() {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);

        assert_eq!(
            create_account(user_id, &form("Visa", 0, 20), &conn),
            Err(Error::InvalidDay(0))
        );
        assert_eq!(
            create_account(user_id, &form("Visa", 5, 32), &conn),
            Err(Error::InvalidDay(32))
        );
    }

    #[test]
    fn rejects_duplicate_name() {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);
        create_account(user_id, &form("Visa", 5, 20), &conn).unwrap();

        assert_eq!(
            create_account(user_id, &form("Visa", 6, 21), &conn),
            Err(Error::DuplicateAccountName("Visa".to_owned()))
        );
    }
}
