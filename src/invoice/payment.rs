//! Settling credit card invoices from their banking account.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{
    AppState, Error, UserID,
    account::{adjust_account_balance, get_account},
    database_id::InvoiceId,
    invoice::{
        CreditCardInvoice,
        core::{INVOICE_COLUMNS, get_invoice, map_invoice_row},
    },
    timezone::now_local,
};

/// Mark an invoice as paid and debit its amount from the owning account.
///
/// Both writes happen in one database transaction. The invoice is only updated
/// while it is still unpaid, so two concurrent payments cannot debit the
/// account twice.
///
/// # Errors
/// This function will return a:
/// - [Error::InvoiceNotFound] if the invoice does not exist or belongs to another user,
/// - [Error::AlreadyPaid] if the invoice has been settled,
/// - [Error::AccountNotFound] if the owning account no longer exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn pay_invoice(
    invoice_id: InvoiceId,
    user_id: UserID,
    paid_at: OffsetDateTime,
    connection: &Connection,
) -> Result<CreditCardInvoice, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let invoice = get_invoice(invoice_id, user_id, &transaction)?;
    if invoice.is_paid {
        return Err(Error::AlreadyPaid);
    }

    let account = get_account(invoice.banking_account_id, user_id, &transaction)?;

    let invoice = transaction
        .prepare(&format!(
            "UPDATE credit_card_invoice SET is_paid = 1, payment_date = ?1
             WHERE id = ?2 AND is_paid = 0
             RETURNING {INVOICE_COLUMNS}"
        ))?
        .query_row((paid_at, invoice.id), map_invoice_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::AlreadyPaid,
            error => error.into(),
        })?;

    adjust_account_balance(account.id, -invoice.amount, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        "Paid invoice {} of {} cents from account {}",
        invoice.id,
        invoice.amount,
        account.id
    );

    Ok(invoice)
}

/// The state needed to pay an invoice.
#[derive(Debug, Clone)]
pub struct PayInvoiceState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for managing invoices.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PayInvoiceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for paying one of the user's invoices, responds with the
/// settled invoice.
pub async fn pay_invoice_endpoint(
    State(state): State<PayInvoiceState>,
    Extension(user_id): Extension<UserID>,
    Path(invoice_id): Path<InvoiceId>,
) -> Result<Json<CreditCardInvoice>, Error> {
    let paid_at = now_local(&state.local_timezone)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    pay_invoice(invoice_id, user_id, paid_at, &connection).map(Json)
}
