use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, UserID, database_id::AccountId};

/// A bank account that transactions are paid from and that credit card
/// invoices are debited from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankingAccount {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The display name of the account, unique per user.
    pub name: String,
    /// The balance in cents. Negative when overdrawn.
    pub balance: i64,
    /// The day of the month the credit card invoice is due.
    pub pay_day: u8,
    /// The day of the month the credit card invoice closes.
    pub close_day: u8,
    /// Whether invoices are paid automatically on the pay day.
    pub automatic_debit_invoices: bool,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS banking_account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            balance INTEGER NOT NULL DEFAULT 0,
            pay_day INTEGER NOT NULL CHECK (pay_day BETWEEN 1 AND 31),
            close_day INTEGER NOT NULL CHECK (close_day BETWEEN 1 AND 31),
            automatic_debit_invoices INTEGER NOT NULL DEFAULT 0,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_banking_account_pay_day
         ON banking_account(pay_day, automatic_debit_invoices)",
        (),
    )?;

    Ok(())
}

pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, user_id, name, balance, pay_day, close_day, automatic_debit_invoices";

pub fn map_row_to_account(row: &Row) -> Result<BankingAccount, rusqlite::Error> {
    Ok(BankingAccount {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        balance: row.get(3)?,
        pay_day: row.get(4)?,
        close_day: row.get(5)?,
        automatic_debit_invoices: row.get(6)?,
    })
}

/// Get one of the user's accounts.
///
/// # Errors
/// Returns [Error::AccountNotFound] if the account does not exist or belongs
/// to another user, or [Error::SqlError] on any other SQL error.
pub fn get_account(
    id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<BankingAccount, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM banking_account WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id), map_row_to_account)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::AccountNotFound,
            error => error.into(),
        })
}

/// Get all of the user's accounts ordered by name.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<BankingAccount>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM banking_account WHERE user_id = ?1 ORDER BY name"
        ))?
        .query_map((user_id,), map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Get the accounts of every user that pay their invoices automatically on `pay_day`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_automatic_debit_accounts(
    pay_day: u8,
    connection: &Connection,
) -> Result<Vec<BankingAccount>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM banking_account
             WHERE automatic_debit_invoices = 1 AND pay_day = ?1
             ORDER BY id"
        ))?
        .query_map((pay_day,), map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Add `delta` cents to the account balance. Use a negative `delta` to debit.
///
/// # Errors
/// Returns [Error::AccountNotFound] if no account has the ID `id`, or
/// [Error::SqlError] on any other SQL error.
pub fn adjust_account_balance(
    id: AccountId,
    delta: i64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE banking_account SET balance = balance + ?1 WHERE id = ?2",
        (delta, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::AccountNotFound);
    }

    Ok(())
}

/// Get the total balance across all of the user's accounts.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_total_account_balance(user_id: UserID, connection: &Connection) -> Result<i64, Error> {
    let mut stmt = connection
        .prepare("SELECT COALESCE(SUM(balance), 0) FROM banking_account WHERE user_id = ?1")?;

    let total: i64 = stmt.query_row((user_id,), |row| row.get(0))?;

    Ok(total)
}
