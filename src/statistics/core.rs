use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserID, account::get_total_account_balance, calendar::date_from_parts,
};

/// A category's income and expense totals for a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// The category name.
    pub category: String,
    /// The category icon.
    pub category_icon: String,
    /// Total income in cents.
    pub income: i64,
    /// Total expenses in cents.
    pub expense: i64,
}

/// A user's balance and cash flow for a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSummary {
    /// The sum of the balances of the user's banking accounts right now.
    pub total_balance: i64,
    /// The month's income in cents.
    pub income: i64,
    /// The month's expenses in cents.
    pub expense: i64,
    /// Income minus expenses.
    pub net: i64,
}

/// Total the user's transactions per category for the zero-based `month`.
///
/// Sorted by expense, largest first.
///
/// # Errors
/// Returns [Error::DateOutOfRange] for an unrepresentable month or
/// [Error::SqlError] if there is an SQL error.
pub fn get_category_breakdown(
    user_id: UserID,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let first = date_from_parts(year, i32::from(month) + 1, 1)?;
    let next = date_from_parts(year, i32::from(month) + 2, 1)?;

    connection
        .prepare(
            "SELECT category, MAX(category_icon),
                COALESCE(SUM(CASE WHEN type = 'income' THEN amount END), 0),
                COALESCE(SUM(CASE WHEN type = 'expense' THEN amount END), 0)
             FROM \"transaction\"
             WHERE user_id = ?1 AND date >= ?2 AND date < ?3
             GROUP BY category
             ORDER BY 4 DESC, category",
        )?
        .query_map((user_id, first, next), |row| {
            Ok(CategoryTotal {
                category: row.get(0)?,
                category_icon: row.get(1)?,
                income: row.get(2)?,
                expense: row.get(3)?,
            })
        })?
        .map(|maybe_total| maybe_total.map_err(Error::from))
        .collect()
}

/// Summarise the user's account balance and the cash flow of the zero-based `month`.
///
/// The cash flow comes from the year history rows, including the ones the
/// user recorded for a team.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_balance_summary(
    user_id: UserID,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<BalanceSummary, Error> {
    let total_balance = get_total_account_balance(user_id, connection)?;

    let (income, expense): (i64, i64) = connection.query_row(
        "SELECT COALESCE(SUM(income), 0), COALESCE(SUM(expense), 0) FROM year_history
         WHERE user_id = ?1 AND year = ?2 AND month = ?3",
        (user_id, year, month),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(BalanceSummary {
        total_balance,
        income,
        expense,
        net: income - expense,
    })
}
