//! Defines the endpoint for listing the user's invoices with their derived status.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::{
    AppState, Error, UserID,
    account::get_accounts,
    database_id::AccountId,
    invoice::{CreditCardInvoice, InvoiceDates, InvoiceStatus, get_invoices},
    timezone::now_local,
};

/// An invoice with the dates and status worked out from its account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceView {
    /// The stored invoice.
    #[serde(flatten)]
    pub invoice: CreditCardInvoice,
    /// The close and due dates.
    #[serde(flatten)]
    pub dates: InvoiceDates,
    /// The status at the time of the request.
    pub status: InvoiceStatus,
}

/// Query parameters for listing invoices.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceQuery {
    /// Only list the invoices of this account.
    pub banking_account_id: Option<AccountId>,
}

/// The state needed to list invoices.
#[derive(Debug, Clone)]
pub struct ListInvoicesState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for reading invoices.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListInvoicesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Get the user's invoices with their close date, due date and status at `now`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error, or
/// [Error::DateOutOfRange] if an invoice's dates cannot be represented.
pub fn get_invoice_views(
    user_id: UserID,
    banking_account_id: Option<AccountId>,
    now: PrimitiveDateTime,
    connection: &Connection,
) -> Result<Vec<InvoiceView>, Error> {
    let accounts: HashMap<_, _> = get_accounts(user_id, connection)?
        .into_iter()
        .map(|account| (account.id, account))
        .collect();

    get_invoices(user_id, banking_account_id, connection)?
        .into_iter()
        .map(|invoice| {
            let account = accounts
                .get(&invoice.banking_account_id)
                .ok_or(Error::AccountNotFound)?;
            let dates = InvoiceDates::for_cycle(
                invoice.year,
                invoice.month,
                account.pay_day,
                account.close_day,
            )?;
            let status = dates.status(invoice.is_paid, now);

            Ok(InvoiceView {
                invoice,
                dates,
                status,
            })
        })
        .collect()
}

/// A route handler for listing the user's invoices.
pub async fn get_invoices_endpoint(
    State(state): State<ListInvoicesState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<Vec<InvoiceView>>, Error> {
    let now = now_local(&state.local_timezone)?;
    let now = PrimitiveDateTime::new(now.date(), now.time());

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_invoice_views(user_id, query.banking_account_id, now, &connection).map(Json)
}
