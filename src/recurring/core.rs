use rusqlite::{
    Connection, Row,
    types::{FromSqlError, Type},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, UserID,
    account::get_account,
    calendar::{business_day_count, is_business_day, is_last_business_day},
    category::get_category_by_name,
    database_id::{AccountId, RecurringId, TeamId},
    team::is_team_member,
    transaction::{PaymentMethod, TransactionType},
};

/// The most business days any month can have.
const MAX_BUSINESS_DAY: u8 = 23;

/// When a recurring transaction fires.
///
/// Every variant is an exact match. A template for the 31st does not fire in
/// a 30 day month and the 23rd business day only exists in some months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "day", rename_all = "snake_case")]
pub enum RecurrenceTrigger {
    /// On this day of the month, 1-31.
    FixedDay(u8),
    /// On the Nth weekday of the month, 1-23.
    NthBusinessDay(u8),
    /// On the last weekday of the month.
    LastBusinessDay,
}

impl RecurrenceTrigger {
    /// Check the trigger can fire in at least some months.
    ///
    /// # Errors
    /// Returns [Error::InvalidTrigger] if the day is out of range.
    pub fn validate(&self) -> Result<(), Error> {
        match *self {
            RecurrenceTrigger::FixedDay(day) if !(1..=31).contains(&day) => Err(
                Error::InvalidTrigger(format!("day {day} is not a day of the month")),
            ),
            RecurrenceTrigger::NthBusinessDay(day) if !(1..=MAX_BUSINESS_DAY).contains(&day) => {
                Err(Error::InvalidTrigger(format!(
                    "business day {day} must be between 1 and {MAX_BUSINESS_DAY}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Whether the trigger fires on `date`.
    pub fn fires_on(&self, date: Date) -> bool {
        TriggerMatch::for_date(date).matches(self)
    }

    fn to_columns(self) -> (&'static str, Option<u8>) {
        match self {
            RecurrenceTrigger::FixedDay(day) => ("fixed_day", Some(day)),
            RecurrenceTrigger::NthBusinessDay(day) => ("nth_business_day", Some(day)),
            RecurrenceTrigger::LastBusinessDay => ("last_business_day", None),
        }
    }

    fn from_columns(kind: &str, value: Option<u8>) -> Result<Self, FromSqlError> {
        match (kind, value) {
            ("fixed_day", Some(day)) => Ok(RecurrenceTrigger::FixedDay(day)),
            ("nth_business_day", Some(day)) => Ok(RecurrenceTrigger::NthBusinessDay(day)),
            ("last_business_day", None) => Ok(RecurrenceTrigger::LastBusinessDay),
            (kind, value) => Err(FromSqlError::Other(
                format!("invalid recurrence trigger {kind} {value:?}").into(),
            )),
        }
    }
}

/// The facts about a date that triggers are matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerMatch {
    /// The day of the month.
    pub day: u8,
    /// The business day count, only set on weekdays so that a weekend never
    /// repeats Friday's count.
    pub business_day: Option<u8>,
    /// Whether the date is the last weekday of the month.
    pub last_business_day: bool,
}

impl TriggerMatch {
    /// Work out the trigger facts for `date`.
    pub fn for_date(date: Date) -> Self {
        Self {
            day: date.day(),
            business_day: is_business_day(date).then(|| business_day_count(date)),
            last_business_day: is_last_business_day(date),
        }
    }

    /// Whether `trigger` fires on the date these facts describe.
    pub fn matches(&self, trigger: &RecurrenceTrigger) -> bool {
        match *trigger {
            RecurrenceTrigger::FixedDay(day) => day == self.day,
            RecurrenceTrigger::NthBusinessDay(day) => Some(day) == self.business_day,
            RecurrenceTrigger::LastBusinessDay => self.last_business_day,
        }
    }
}

/// A template for a transaction that is recorded automatically every month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    /// The ID of the template.
    pub id: RecurringId,
    /// The user the transactions are recorded for.
    pub user_id: UserID,
    /// The team the transactions are shared with.
    pub team_id: Option<TeamId>,
    /// The banking account the money moves through.
    pub banking_account_id: Option<AccountId>,
    /// The amount in cents.
    pub amount: i64,
    /// Whether the money comes in or goes out.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// How the transactions are paid for.
    pub payment: PaymentMethod,
    /// The category name.
    pub category: String,
    /// The category icon when the template was created.
    pub category_icon: String,
    /// When the template fires.
    pub trigger: RecurrenceTrigger,
}

/// The request body for creating a recurring transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringForm {
    /// The amount in cents.
    pub amount: i64,
    /// Whether the money comes in or goes out.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// How the transactions are paid for.
    #[serde(default)]
    pub payment: PaymentMethod,
    /// The name of one of the user's categories.
    pub category: String,
    /// The team to share the transactions with.
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// The banking account the money moves through.
    #[serde(default)]
    pub banking_account_id: Option<AccountId>,
    /// When the template fires.
    pub trigger: RecurrenceTrigger,
}

/// Create the recurring transaction table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_recurring_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recurring_transaction (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            team_id INTEGER,
            banking_account_id INTEGER,
            amount INTEGER NOT NULL CHECK (amount > 0),
            type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
            payment TEXT NOT NULL DEFAULT 'debit' CHECK (payment IN ('debit', 'credit')),
            category TEXT NOT NULL,
            category_icon TEXT NOT NULL,
            trigger_kind TEXT NOT NULL,
            trigger_value INTEGER,
            CHECK (
                (trigger_kind = 'fixed_day' AND trigger_value BETWEEN 1 AND 31)
                OR (trigger_kind = 'nth_business_day' AND trigger_value BETWEEN 1 AND 23)
                OR (trigger_kind = 'last_business_day' AND trigger_value IS NULL)
            ),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(team_id) REFERENCES team(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(banking_account_id) REFERENCES banking_account(id)
                ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_recurring_transaction_trigger
         ON recurring_transaction(trigger_kind, trigger_value)",
        (),
    )?;

    Ok(())
}

const RECURRING_COLUMNS: &str = "id, user_id, team_id, banking_account_id, amount, type, payment, \
    category, category_icon, trigger_kind, trigger_value";

fn map_recurring_row(row: &Row) -> Result<RecurringTransaction, rusqlite::Error> {
    let kind: String = row.get(9)?;
    let value: Option<u8> = row.get(10)?;
    let trigger = RecurrenceTrigger::from_columns(&kind, value)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(error)))?;

    Ok(RecurringTransaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        team_id: row.get(2)?,
        banking_account_id: row.get(3)?,
        amount: row.get(4)?,
        transaction_type: row.get(5)?,
        payment: row.get(6)?,
        category: row.get(7)?,
        category_icon: row.get(8)?,
        trigger,
    })
}

/// Create a recurring transaction for `user_id`.
///
/// The template is checked the same way a transaction is when it is recorded,
/// so it does not start failing once it fires.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not positive,
/// - [Error::InvalidTrigger] if the trigger day is out of range,
/// - [Error::InvalidPayment] for a credit payment that is income or has no account,
/// - [Error::CategoryNotFound] if the user has no category with the given name,
/// - [Error::TeamNotFound] if the user is not a member of the team,
/// - [Error::AccountNotFound] if the account does not belong to the user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_recurring_transaction(
    user_id: UserID,
    form: &RecurringForm,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    if form.amount <= 0 {
        return Err(Error::InvalidAmount(form.amount));
    }

    form.trigger.validate()?;

    if form.payment == PaymentMethod::Credit {
        if form.transaction_type != TransactionType::Expense {
            return Err(Error::InvalidPayment("credit payments must be expenses"));
        }

        if form.banking_account_id.is_none() {
            return Err(Error::InvalidPayment(
                "credit payments must name a banking account",
            ));
        }
    }

    let category = get_category_by_name(user_id, &form.category, connection)?;

    if let Some(team_id) = form.team_id {
        if !is_team_member(team_id, user_id, connection)? {
            return Err(Error::TeamNotFound);
        }
    }

    if let Some(account_id) = form.banking_account_id {
        get_account(account_id, user_id, connection)?;
    }

    let (trigger_kind, trigger_value) = form.trigger.to_columns();

    connection
        .prepare(&format!(
            "INSERT INTO recurring_transaction
                (user_id, team_id, banking_account_id, amount, type, payment,
                 category, category_icon, trigger_kind, trigger_value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING {RECURRING_COLUMNS}"
        ))?
        .query_row(
            (
                user_id,
                form.team_id,
                form.banking_account_id,
                form.amount,
                form.transaction_type,
                form.payment,
                &category.name,
                &category.icon,
                trigger_kind,
                trigger_value,
            ),
            map_recurring_row,
        )
        .map_err(Error::from)
}

/// Get the user's recurring transactions.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_recurring_transactions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<RecurringTransaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_transaction WHERE user_id = ?1 ORDER BY id"
        ))?
        .query_map((user_id,), map_recurring_row)?
        .map(|maybe_template| maybe_template.map_err(Error::from))
        .collect()
}

/// Get every user's recurring transactions that fire on `today`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_due_recurring_transactions(
    today: Date,
    connection: &Connection,
) -> Result<Vec<RecurringTransaction>, Error> {
    let facts = TriggerMatch::for_date(today);

    connection
        .prepare(&format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_transaction
             WHERE (trigger_kind = 'fixed_day' AND trigger_value = ?1)
                OR (trigger_kind = 'nth_business_day' AND trigger_value = ?2)
                OR (trigger_kind = 'last_business_day' AND ?3)
             ORDER BY id"
        ))?
        .query_map(
            (facts.day, facts.business_day, facts.last_business_day),
            map_recurring_row,
        )?
        .map(|maybe_template| maybe_template.map_err(Error::from))
        .collect()
}

/// Delete one of the user's recurring transactions.
///
/// Transactions it already recorded are kept.
///
/// # Errors
/// Returns [Error::TemplateNotFound] if the template does not exist or belongs
/// to another user, or [Error::SqlError] on any other SQL error.
pub fn delete_recurring_transaction(
    id: RecurringId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM recurring_transaction WHERE id = ?1 AND user_id = ?2",
        (id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::TemplateNotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        Error, UserID,
        recurring::{
            RecurrenceTrigger, RecurringForm, TriggerMatch, create_recurring_transaction,
            delete_recurring_transaction, get_due_recurring_transactions,
            get_recurring_transactions,
        },
        test_utils::{get_test_connection, must_create_category, must_create_user},
        transaction::{PaymentMethod, TransactionType},
    };

    fn form(trigger: RecurrenceTrigger) -> RecurringForm {
        RecurringForm {
            amount: 150_000,
            transaction_type: TransactionType::Expense,
            payment: PaymentMethod::Debit,
            category: "Rent".to_owned(),
            team_id: None,
            banking_account_id: None,
            trigger,
        }
    }

    fn setup() -> (rusqlite::Connection, UserID) {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);
        must_create_category(user_id, "Rent", &conn);
        (conn, user_id)
    }

    #[test]
    fn trigger_serializes_as_tagged_object() {
        let json = serde_json::to_string(&RecurrenceTrigger::NthBusinessDay(5)).unwrap();
        assert_eq!(json, r#"{"kind":"nth_business_day","day":5}"#);

        let parsed: RecurrenceTrigger =
            serde_json::from_str(r#"{"kind":"last_business_day"}"#).unwrap();
        assert_eq!(parsed, RecurrenceTrigger::LastBusinessDay);
    }

    #[test]
    fn weekend_has_no_business_day_count() {
        // 2024-01-06 is a Saturday.
        let saturday = TriggerMatch::for_date(date!(2024 - 01 - 06));
        let friday = TriggerMatch::for_date(date!(2024 - 01 - 05));

        assert_eq!(saturday.business_day, None);
        assert_eq!(friday.business_day, Some(5));
        assert!(!RecurrenceTrigger::NthBusinessDay(5).fires_on(date!(2024 - 01 - 06)));
        assert!(RecurrenceTrigger::NthBusinessDay(5).fires_on(date!(2024 - 01 - 05)));
    }

    #[test]
    fn fixed_day_does_not_clamp() {
        let trigger = RecurrenceTrigger::FixedDay(31);

        assert!(!trigger.fires_on(date!(2024 - 04 - 30)));
        assert!(trigger.fires_on(date!(2024 - 05 - 31)));
    }

    #[test]
    fn last_business_day_fires_on_friday_before_weekend_month_end() {
        // 2024-08-31 is a Saturday.
        assert!(RecurrenceTrigger::LastBusinessDay.fires_on(date!(2024 - 08 - 30)));
        assert!(!RecurrenceTrigger::LastBusinessDay.fires_on(date!(2024 - 08 - 31)));
    }

    #[test]
    fn rejects_out_of_range_triggers() {
        let (conn, user_id) = setup();

        for trigger in [
            RecurrenceTrigger::FixedDay(0),
            RecurrenceTrigger::FixedDay(32),
            RecurrenceTrigger::NthBusinessDay(0),
            RecurrenceTrigger::NthBusinessDay(24),
        ] {
            assert!(matches!(
                create_recurring_transaction(user_id, &form(trigger), &conn),
                Err(Error::InvalidTrigger(_))
            ));
        }
    }

    #[test]
    fn create_snapshots_category_icon() {
        let (conn, user_id) = setup();

        let template =
            create_recurring_transaction(user_id, &form(RecurrenceTrigger::FixedDay(1)), &conn)
                .unwrap();

        assert_eq!(template.category_icon, "tag");
        assert_eq!(template.trigger, RecurrenceTrigger::FixedDay(1));
        assert_eq!(get_recurring_transactions(user_id, &conn), Ok(vec![template]));
    }

    #[test]
    fn create_requires_category() {
        let (conn, user_id) = setup();
        let mut form = form(RecurrenceTrigger::FixedDay(1));
        form.category = "Gym".to_owned();

        assert_eq!(
            create_recurring_transaction(user_id, &form, &conn),
            Err(Error::CategoryNotFound("Gym".to_owned()))
        );
    }

    #[test]
    fn selects_only_matching_templates() {
        let (conn, user_id) = setup();
        // 2024-01-05 is the fifth day and the fifth business day.
        let fixed =
            create_recurring_transaction(user_id, &form(RecurrenceTrigger::FixedDay(5)), &conn)
                .unwrap();
        let business = create_recurring_transaction(
            user_id,
            &form(RecurrenceTrigger::NthBusinessDay(5)),
            &conn,
        )
        .unwrap();
        create_recurring_transaction(user_id, &form(RecurrenceTrigger::FixedDay(6)), &conn)
            .unwrap();
        create_recurring_transaction(user_id, &form(RecurrenceTrigger::LastBusinessDay), &conn)
            .unwrap();

        let due = get_due_recurring_transactions(date!(2024 - 01 - 05), &conn).unwrap();

        assert_eq!(due, vec![fixed, business]);
    }

    #[test]
    fn delete_is_scoped_to_owner() {
        let (conn, user_id) = setup();
        let other = must_create_user(&conn);
        let template =
            create_recurring_transaction(user_id, &form(RecurrenceTrigger::FixedDay(1)), &conn)
                .unwrap();

        assert_eq!(
            delete_recurring_transaction(template.id, other, &conn),
            Err(Error::TemplateNotFound)
        );
        assert_eq!(delete_recurring_transaction(template.id, user_id, &conn), Ok(()));
        assert_eq!(get_recurring_transactions(user_id, &conn), Ok(vec![]));
    }
}
