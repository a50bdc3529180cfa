//! A once-per-day lock for the automatic debit sweep.
//!
//! The lock is a row keyed by the date. Whoever inserts the row first owns the
//! day, everyone else sees a primary key violation.

use rusqlite::Connection;
use time::Date;

use crate::{Error, calendar::month_index};

/// Create the table that records which days the sweep has run on.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_daily_debit_checker_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS daily_debit_checker (
            day INTEGER NOT NULL,
            month INTEGER NOT NULL,
            year INTEGER NOT NULL,
            PRIMARY KEY(day, month, year)
        )",
        (),
    )?;

    Ok(())
}

/// Try to claim `today` for the automatic debit sweep.
///
/// Returns `Ok(true)` for the first caller on a given date and `Ok(false)` for
/// every later caller. The caller that gets `false` must not run the sweep.
///
/// # Errors
/// Returns [Error::SqlError] for SQL errors other than the date already being taken.
pub fn try_acquire_daily_slot(today: Date, connection: &Connection) -> Result<bool, Error> {
    let result = connection.execute(
        "INSERT INTO daily_debit_checker (day, month, year) VALUES (?1, ?2, ?3)",
        (today.day(), month_index(today), today.year()),
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
            },
            _,
        )) => {
            tracing::info!("Automatic debits for {today} were already claimed");
            Ok(false)
        }
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{invoice::try_acquire_daily_slot, test_utils::get_test_connection};

    #[test]
    fn second_attempt_on_same_day_fails() {
        let conn = get_test_connection();
        let today = date!(2024 - 02 - 05);

        assert_eq!(try_acquire_daily_slot(today, &conn), Ok(true));
        assert_eq!(try_acquire_daily_slot(today, &conn), Ok(false));
    }

    #[test]
    fn each_day_has_its_own_slot() {
        let conn = get_test_connection();

        assert_eq!(try_acquire_daily_slot(date!(2024 - 02 - 05), &conn), Ok(true));
        assert_eq!(try_acquire_daily_slot(date!(2024 - 02 - 06), &conn), Ok(true));
        assert_eq!(try_acquire_daily_slot(date!(2024 - 03 - 05), &conn), Ok(true));
        assert_eq!(try_acquire_daily_slot(date!(2025 - 02 - 05), &conn), Ok(true));
    }
}
