//! Recurring transactions are templates that record a transaction on a fixed
//! day, the Nth business day or the last business day of every month.

mod core;
mod endpoints;
mod engine;

pub use core::{
    RecurrenceTrigger, RecurringForm, RecurringTransaction, TriggerMatch,
    create_recurring_transaction, create_recurring_transaction_table,
    delete_recurring_transaction, get_due_recurring_transactions, get_recurring_transactions,
};
pub use endpoints::{create_recurring_endpoint, delete_recurring_endpoint, get_recurring_endpoint};
pub use engine::{FiredRecurrence, RecurrenceFailure, RecurrenceRun, run_daily_recurrences};
