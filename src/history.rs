//! Running income and expense totals per day and per month.
//!
//! The rows are maintained incrementally by the ledger: every recorded
//! transaction adds its amount to one month row and one year row, and every
//! deleted transaction takes it back off. They are never rebuilt from the
//! transaction table.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, UserID,
    calendar::month_index,
    database_id::TeamId,
    transaction::TransactionType,
};

/// The totals for one day of a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthHistory {
    /// The user that recorded the transactions.
    pub user_id: UserID,
    /// The team the transactions were shared with, if any.
    pub team_id: Option<TeamId>,
    /// The day of the month, 1-31.
    pub day: u8,
    /// The zero-based month.
    pub month: u8,
    /// The year.
    pub year: i32,
    /// Total income in cents.
    pub income: i64,
    /// Total expenses in cents.
    pub expense: i64,
}

/// The totals for one month of a year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearHistory {
    /// The user that recorded the transactions.
    pub user_id: UserID,
    /// The team the transactions were shared with, if any.
    pub team_id: Option<TeamId>,
    /// The zero-based month.
    pub month: u8,
    /// The year.
    pub year: i32,
    /// Total income in cents.
    pub income: i64,
    /// Total expenses in cents.
    pub expense: i64,
}

/// Create the month and year history tables.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_history_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS month_history (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            team_id INTEGER,
            day INTEGER NOT NULL CHECK (day BETWEEN 1 AND 31),
            month INTEGER NOT NULL CHECK (month BETWEEN 0 AND 11),
            year INTEGER NOT NULL,
            income INTEGER NOT NULL DEFAULT 0,
            expense INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(team_id) REFERENCES team(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_month_history_key
         ON month_history(user_id, year, month, day, team_id)",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS year_history (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            team_id INTEGER,
            month INTEGER NOT NULL CHECK (month BETWEEN 0 AND 11),
            year INTEGER NOT NULL,
            income INTEGER NOT NULL DEFAULT 0,
            expense INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(team_id) REFERENCES team(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_year_history_key
         ON year_history(user_id, year, month, team_id)",
        (),
    )?;

    Ok(())
}

/// Add `delta` cents to the income or expense totals for `date`.
///
/// Both the day row and the month row are updated in place, or inserted
/// seeded with `delta` when they do not exist yet. Use a negative `delta` to
/// take a deleted transaction back off.
///
/// Call this inside the same database transaction that writes the
/// transaction row so the totals never drift from the ledger.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn add_to_history(
    user_id: UserID,
    team_id: Option<TeamId>,
    date: Date,
    transaction_type: TransactionType,
    delta: i64,
    connection: &Connection,
) -> Result<(), Error> {
    let column = match transaction_type {
        TransactionType::Income => "income",
        TransactionType::Expense => "expense",
    };
    let (income, expense) = match transaction_type {
        TransactionType::Income => (delta, 0),
        TransactionType::Expense => (0, delta),
    };
    let day = date.day();
    let month = month_index(date);
    let year = date.year();

    let rows_affected = connection.execute(
        &format!(
            "UPDATE month_history SET {column} = {column} + ?1
             WHERE user_id = ?2 AND team_id IS ?3 AND day = ?4 AND month = ?5 AND year = ?6"
        ),
        (delta, user_id, team_id, day, month, year),
    )?;

    if rows_affected == 0 {
        connection.execute(
            "INSERT INTO month_history (user_id, team_id, day, month, year, income, expense)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (user_id, team_id, day, month, year, income, expense),
        )?;
    }

    let rows_affected = connection.execute(
        &format!(
            "UPDATE year_history SET {column} = {column} + ?1
             WHERE user_id = ?2 AND team_id IS ?3 AND month = ?4 AND year = ?5"
        ),
        (delta, user_id, team_id, month, year),
    )?;

    if rows_affected == 0 {
        connection.execute(
            "INSERT INTO year_history (user_id, team_id, month, year, income, expense)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (user_id, team_id, month, year, income, expense),
        )?;
    }

    Ok(())
}

fn map_month_row(row: &Row) -> Result<MonthHistory, rusqlite::Error> {
    Ok(MonthHistory {
        user_id: row.get(0)?,
        team_id: row.get(1)?,
        day: row.get(2)?,
        month: row.get(3)?,
        year: row.get(4)?,
        income: row.get(5)?,
        expense: row.get(6)?,
    })
}

fn map_year_row(row: &Row) -> Result<YearHistory, rusqlite::Error> {
    Ok(YearHistory {
        user_id: row.get(0)?,
        team_id: row.get(1)?,
        month: row.get(2)?,
        year: row.get(3)?,
        income: row.get(4)?,
        expense: row.get(5)?,
    })
}

/// Get the user's per-day rows for a month ordered by day.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_month_history(
    user_id: UserID,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Vec<MonthHistory>, Error> {
    connection
        .prepare(
            "SELECT user_id, team_id, day, month, year, income, expense FROM month_history
             WHERE user_id = ?1 AND year = ?2 AND month = ?3
             ORDER BY day, team_id",
        )?
        .query_map((user_id, year, month), map_month_row)?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}

/// Get the user's per-month rows for a year ordered by month.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_year_history(
    user_id: UserID,
    year: i32,
    connection: &Connection,
) -> Result<Vec<YearHistory>, Error> {
    connection
        .prepare(
            "SELECT user_id, team_id, month, year, income, expense FROM year_history
             WHERE user_id = ?1 AND year = ?2
             ORDER BY month, team_id",
        )?
        .query_map((user_id, year), map_year_row)?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}
