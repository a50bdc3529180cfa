//! Records today's recurring transactions.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{RecurringId, TransactionId},
    recurring::{RecurringTransaction, get_due_recurring_transactions},
    transaction::{Transaction, record_transaction},
};

/// A template that fired and the transaction it recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredRecurrence {
    /// The template.
    pub template: RecurringTransaction,
    /// The transaction recorded for it.
    pub transaction_id: TransactionId,
}

/// A template that should have fired but could not be recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceFailure {
    /// The template.
    pub recurring_id: RecurringId,
    /// Why recording failed.
    pub error: String,
}

/// The outcome of one daily run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRun {
    /// The date the run was for.
    pub date: Date,
    /// The templates that recorded a transaction.
    pub fired: Vec<FiredRecurrence>,
    /// The templates that failed.
    pub failures: Vec<RecurrenceFailure>,
}

/// Record a transaction dated `today` for every template that fires today.
///
/// Each template is recorded in its own database transaction. A failing
/// template is reported in [RecurrenceRun::failures] and the rest still fire.
///
/// Running twice for the same date records everything twice, the scheduler
/// must call this once per day.
///
/// # Errors
/// Returns [Error::SqlError] if the templates could not be loaded.
pub fn run_daily_recurrences(today: Date, connection: &Connection) -> Result<RecurrenceRun, Error> {
    let templates = get_due_recurring_transactions(today, connection)?;
    let mut run = RecurrenceRun {
        date: today,
        fired: Vec::new(),
        failures: Vec::new(),
    };

    for template in templates {
        let new_transaction = Transaction::build(
            template.user_id,
            template.amount,
            template.transaction_type,
            &template.category,
            today,
        )
        .team_id(template.team_id)
        .banking_account_id(template.banking_account_id)
        .payment(template.payment);

        match record_transaction(new_transaction, connection) {
            Ok(transaction) => run.fired.push(FiredRecurrence {
                template,
                transaction_id: transaction.id,
            }),
            Err(error) => {
                tracing::warn!(
                    "Could not record recurring transaction {}: {error}",
                    template.id
                );
                run.failures.push(RecurrenceFailure {
                    recurring_id: template.id,
                    error: error.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Recurring transactions for {today}: {} fired, {} failed",
        run.fired.len(),
        run.failures.len()
    );

    Ok(run)
}
