//! Database initialisation.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    account::create_account_table,
    category::create_category_table,
    history::create_history_tables,
    invoice::{create_daily_debit_checker_table, create_invoice_table},
    recurring::create_recurring_transaction_table,
    team::create_team_tables,
    transaction::create_transaction_table,
    user::create_user_table,
};

/// Create the application tables if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection`, the rest runs in a
/// single exclusive transaction so a half-created schema is never left behind.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_account_table(&transaction)?;
    create_team_tables(&transaction)?;
    create_transaction_table(&transaction)?;
    create_history_tables(&transaction)?;
    create_invoice_table(&transaction)?;
    create_daily_debit_checker_table(&transaction)?;
    create_recurring_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
