//! The daily automatic debit sweep.
//!
//! Accounts with automatic debits enabled have the invoice that is due today
//! paid for them. The sweep claims the date first so it never runs twice on
//! the same day.
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    account::get_automatic_debit_accounts,
    database_id::{AccountId, InvoiceId},
    invoice::{
        billing_cycle_due_on, get_invoice_for_cycle, pay_invoice, try_acquire_daily_slot,
    },
};

/// What the sweep did for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    /// The invoice was paid.
    Paid {
        /// The invoice that was paid.
        invoice_id: InvoiceId,
        /// The amount debited in cents.
        amount: i64,
    },
    /// There was no unpaid invoice for the cycle.
    NothingDue,
    /// Paying the invoice failed.
    Failed {
        /// Why the payment failed.
        error: String,
    },
}

/// The sweep result for one automatic debit account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweptInvoice {
    /// The account that was swept.
    pub banking_account_id: AccountId,
    /// The owner of the account, on whose behalf the invoice was paid.
    pub user_id: UserID,
    /// The year of the billing cycle due today.
    pub year: i32,
    /// The zero-based month of the billing cycle due today.
    pub month: u8,
    /// What happened.
    #[serde(flatten)]
    pub outcome: SweepOutcome,
}

/// Pay every automatic debit invoice that is due on `today`.
///
/// Failures for one account are logged and reported in its [SweptInvoice],
/// the other accounts are still processed.
///
/// # Errors
/// This function will return a:
/// - [Error::AlreadySweptToday] if the sweep already ran for `today`,
/// - or [Error::SqlError] if the accounts could not be loaded.
pub fn sweep_automatic_debits(
    today: Date,
    paid_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<SweptInvoice>, Error> {
    if !try_acquire_daily_slot(today, connection)? {
        return Err(Error::AlreadySweptToday);
    }

    let accounts = get_automatic_debit_accounts(today.day(), connection)?;
    let mut swept = Vec::with_capacity(accounts.len());

    for account in accounts {
        let (year, month) = billing_cycle_due_on(today, account.pay_day, account.close_day);

        let outcome = match get_invoice_for_cycle(account.id, year, month, connection) {
            Ok(Some(invoice)) if !invoice.is_paid => {
                match pay_invoice(invoice.id, account.user_id, paid_at, connection) {
                    Ok(invoice) => SweepOutcome::Paid {
                        invoice_id: invoice.id,
                        amount: invoice.amount,
                    },
                    Err(error) => {
                        tracing::warn!(
                            "Could not pay invoice {} for account {}: {error}",
                            invoice.id,
                            account.id
                        );
                        SweepOutcome::Failed {
                            error: error.to_string(),
                        }
                    }
                }
            }
            Ok(_) => SweepOutcome::NothingDue,
            Err(error) => {
                tracing::warn!("Could not load invoice for account {}: {error}", account.id);
                SweepOutcome::Failed {
                    error: error.to_string(),
                }
            }
        };

        swept.push(SweptInvoice {
            banking_account_id: account.id,
            user_id: account.user_id,
            year,
            month,
            outcome,
        });
    }

    tracing::info!("Swept {} automatic debit accounts for {today}", swept.len());

    Ok(swept)
}
