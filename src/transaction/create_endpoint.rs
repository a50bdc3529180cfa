//! Defines the endpoint for recording a new transaction.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error, UserID,
    database_id::{AccountId, TeamId},
    timezone::now_local,
    transaction::{PaymentMethod, Transaction, TransactionType, record_transaction},
};

/// The state needed for recording a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for recording a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionForm {
    /// The amount in cents.
    pub amount: i64,
    /// Whether the money came in or went out.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// How the transaction was paid for.
    #[serde(default)]
    pub payment: PaymentMethod,
    /// The name of one of the user's categories.
    pub category: String,
    /// When the transaction happened, defaults to today in the local timezone.
    #[serde(default)]
    pub date: Option<Date>,
    /// The team to share the transaction with.
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// The banking account the money moved through.
    #[serde(default)]
    pub banking_account_id: Option<AccountId>,
}

/// A route handler for recording a new transaction, responds with the
/// recorded transaction.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<TransactionForm>,
) -> Response {
    let date = match form.date {
        Some(date) => date,
        None => match now_local(&state.local_timezone) {
            Ok(now) => now.date(),
            Err(error) => return error.into_response(),
        },
    };

    let new_transaction = Transaction::build(
        user_id,
        form.amount,
        form.transaction_type,
        &form.category,
        date,
    )
    .team_id(form.team_id)
    .banking_account_id(form.banking_account_id)
    .payment(form.payment);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match record_transaction(new_transaction, &connection) {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(error) => {
            tracing::warn!("Could not record transaction {form:?}: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Json, extract::State, http::StatusCode};
    use time::macros::date;

    use crate::{
        test_utils::{
            assert_status, get_test_connection, must_create_category, must_create_user,
            parse_json,
        },
        transaction::{
            PaymentMethod, Transaction, TransactionType,
            create_endpoint::{CreateTransactionState, TransactionForm, create_transaction_endpoint},
        },
    };

    fn form(category: &str) -> TransactionForm {
        TransactionForm {
            amount: 4_599,
            transaction_type: TransactionType::Expense,
            payment: PaymentMethod::Debit,
            category: category.to_owned(),
            date: Some(date!(2025 - 01 - 15)),
            team_id: None,
            banking_account_id: None,
        }
    }

    #[tokio::test]
    async fn can_record_transaction() {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);
        must_create_category(user_id, "Groceries", &conn);
        let state = CreateTransactionState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            create_transaction_endpoint(State(state), Extension(user_id), Json(form("Groceries")))
                .await;

        assert_status(&response, StatusCode::CREATED);
        let transaction: Transaction = parse_json(response).await;
        assert_eq!(transaction.amount, 4_599);
        assert_eq!(transaction.date, date!(2025 - 01 - 15));
        assert_eq!(transaction.user_id, user_id);
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);
        let state = CreateTransactionState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            create_transaction_endpoint(State(state), Extension(user_id), Json(form("Rent")))
                .await;

        assert_status(&response, StatusCode::NOT_FOUND);
    }

    #[test]
    fn form_defaults_optional_fields() {
        let form: TransactionForm = serde_json::from_str(
            r#"{"amount": 100, "type": "income", "category": "Salary"}"#,
        )
        .unwrap();

        assert_eq!(form.payment, PaymentMethod::Debit);
        assert_eq!(form.date, None);
        assert_eq!(form.team_id, None);
    }
}
