//! Defines the core data models and database queries for transactions.

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    database_id::{AccountId, TeamId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionType {
    fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// The sign applied to a banking account balance for this type.
    pub fn balance_sign(&self) -> i64 {
        match self {
            TransactionType::Income => 1,
            TransactionType::Expense => -1,
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(FromSqlError::Other(
                format!("unknown transaction type {other}").into(),
            )),
        }
    }
}

/// How a transaction was paid for.
///
/// Debit payments move the linked account's balance straight away, credit
/// payments accrue on the account's credit card invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid from the account balance, or cash when no account is given.
    #[default]
    Debit,
    /// Charged to the account's credit card.
    Credit,
}

impl PaymentMethod {
    fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Debit => "debit",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl ToSql for PaymentMethod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PaymentMethod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "debit" => Ok(PaymentMethod::Debit),
            "credit" => Ok(PaymentMethod::Credit),
            other => Err(FromSqlError::Other(
                format!("unknown payment method {other}").into(),
            )),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build] and
/// [crate::record_transaction].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that recorded the transaction.
    pub user_id: UserID,
    /// The team the transaction is shared with.
    pub team_id: Option<TeamId>,
    /// The banking account the money moved through.
    pub banking_account_id: Option<AccountId>,
    /// The amount in cents, always positive.
    pub amount: i64,
    /// Whether the money came in or went out.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// How the transaction was paid for.
    pub payment: PaymentMethod,
    /// The name of the category.
    pub category: String,
    /// The category's icon at the time the transaction was recorded.
    pub category_icon: String,
    /// When the transaction happened.
    pub date: Date,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(
        user_id: UserID,
        amount: i64,
        transaction_type: TransactionType,
        category: &str,
        date: Date,
    ) -> NewTransaction {
        NewTransaction {
            user_id,
            team_id: None,
            banking_account_id: None,
            amount,
            transaction_type,
            payment: PaymentMethod::Debit,
            category: category.to_owned(),
            date,
        }
    }
}

/// A builder for transactions that have not been recorded yet.
///
/// # Examples
///
/// ```ignore
/// use time::macros::date;
///
/// use crate::transaction::{PaymentMethod, Transaction, TransactionType};
///
/// let new_transaction = Transaction::build(
///         user_id,
///         4_599,
///         TransactionType::Expense,
///         "Groceries",
///         date!(2025-01-15),
///     )
///     .banking_account_id(Some(1))
///     .payment(PaymentMethod::Credit);
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct NewTransaction {
    /// The user recording the transaction.
    pub user_id: UserID,

    /// The team to share the transaction with. The user must be a member.
    pub team_id: Option<TeamId>,

    /// The banking account the money moves through.
    ///
    /// Required for credit payments, which are added to the account's invoice.
    pub banking_account_id: Option<AccountId>,

    /// The amount in cents. Must be greater than zero.
    pub amount: i64,

    /// Whether the money came in or went out.
    pub transaction_type: TransactionType,

    /// How the transaction was paid for. Defaults to debit.
    pub payment: PaymentMethod,

    /// The name of one of the user's categories.
    pub category: String,

    /// When the transaction happened.
    pub date: Date,
}

impl NewTransaction {
    /// Set the team the transaction is shared with.
    pub fn team_id(mut self, team_id: Option<TeamId>) -> Self {
        self.team_id = team_id;
        self
    }

    /// Set the banking account the money moves through.
    pub fn banking_account_id(mut self, banking_account_id: Option<AccountId>) -> Self {
        self.banking_account_id = banking_account_id;
        self
    }

    /// Set the payment method.
    pub fn payment(mut self, payment: PaymentMethod) -> Self {
        self.payment = payment;
        self
    }
}

/// Limits for listing transactions. Both ends are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// The earliest date to include.
    pub from: Option<Date>,
    /// The latest date to include.
    pub to: Option<Date>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub(crate) const TRANSACTION_COLUMNS: &str = "id, user_id, team_id, banking_account_id, amount, \
    type, payment, category, category_icon, date, created_at";

/// Retrieve one of the user's transactions by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction of the user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_one((id, user_id), map_transaction_row)?;

    Ok(transaction)
}

/// List the transactions the user can see within `filter`, newest first.
///
/// Transactions shared with any of the user's teams are included.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE (user_id = ?1
                    OR team_id IN (SELECT team_id FROM team_member WHERE user_id = ?1))
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date DESC, id DESC"
        ))?
        .query_map((user_id, filter.from, filter.to), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                team_id INTEGER,
                banking_account_id INTEGER,
                amount INTEGER NOT NULL CHECK (amount > 0),
                type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
                payment TEXT NOT NULL DEFAULT 'debit' CHECK (payment IN ('debit', 'credit')),
                category TEXT NOT NULL,
                category_icon TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(team_id) REFERENCES team(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(banking_account_id) REFERENCES banking_account(id)
                    ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_team_date ON \"transaction\"(team_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        team_id: row.get(2)?,
        banking_account_id: row.get(3)?,
        amount: row.get(4)?,
        transaction_type: row.get(5)?,
        payment: row.get(6)?,
        category: row.get(7)?,
        category_icon: row.get(8)?,
        date: row.get(9)?,
        created_at: row.get(10)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use time::macros::date;

    use crate::{
        Error,
        team::{add_team_member, create_team},
        test_utils::{get_test_connection, must_create_category, must_create_user},
        transaction::{
            Transaction, TransactionFilter, TransactionType, get_transaction, get_transactions,
            record_transaction,
        },
    };

    #[test]
    fn get_transaction_is_scoped_to_owner() {
        let conn = get_test_connection();
        let alice = must_create_user(&conn);
        let bob = must_create_user(&conn);
        must_create_category(alice, "Food", &conn);
        let transaction = record_transaction(
            Transaction::build(alice, 100, TransactionType::Expense, "Food", date!(2025 - 10 - 05)),
            &conn,
        )
        .unwrap();

        assert_eq!(
            get_transaction(transaction.id, alice, &conn),
            Ok(transaction.clone())
        );
        assert_eq!(
            get_transaction(transaction.id, bob, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn list_filters_by_date_newest_first() {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);
        must_create_category(user_id, "Food", &conn);
        for day in [date!(2025 - 01 - 31), date!(2025 - 02 - 01), date!(2025 - 02 - 15)] {
            record_transaction(
                Transaction::build(user_id, 100, TransactionType::Expense, "Food", day),
                &conn,
            )
            .unwrap();
        }

        let got = get_transactions(
            user_id,
            &TransactionFilter {
                from: Some(date!(2025 - 02 - 01)),
                to: Some(date!(2025 - 02 - 28)),
            },
            &conn,
        )
        .unwrap();

        let dates: Vec<_> = got.iter().map(|transaction| transaction.date).collect();
        assert_eq!(dates, vec![date!(2025 - 02 - 15), date!(2025 - 02 - 01)]);
    }

    #[test]
    fn list_includes_team_transactions() {
        let conn = get_test_connection();
        let owner = must_create_user(&conn);
        let member = must_create_user(&conn);
        let outsider = must_create_user(&conn);
        let team = create_team(owner, "Flat", 50, &conn).unwrap();
        add_team_member(team.id, owner, member, 50, &conn).unwrap();
        must_create_category(owner, "Rent", &conn);
        must_create_category(owner, "Snacks", &conn);
        record_transaction(
            Transaction::build(owner, 90_000, TransactionType::Expense, "Rent", date!(2025 - 02 - 01))
                .team_id(Some(team.id)),
            &conn,
        )
        .unwrap();
        record_transaction(
            Transaction::build(owner, 500, TransactionType::Expense, "Snacks", date!(2025 - 02 - 01)),
            &conn,
        )
        .unwrap();

        let seen_by_member = get_transactions(member, &TransactionFilter::default(), &conn).unwrap();
        let seen_by_outsider =
            get_transactions(outsider, &TransactionFilter::default(), &conn).unwrap();

        assert_eq!(seen_by_member.len(), 1);
        assert_eq!(seen_by_member[0].category, "Rent");
        assert!(seen_by_outsider.is_empty());
    }
}
