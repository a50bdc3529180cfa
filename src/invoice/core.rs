use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::{
    Error, UserID,
    account::BankingAccount,
    calendar::{date_from_parts, month_index, shift_month},
    database_id::{AccountId, InvoiceId},
};

/// The credit card bill of one banking account for one billing cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCardInvoice {
    /// The ID of the invoice.
    pub id: InvoiceId,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The account the card belongs to and that pays the invoice.
    pub banking_account_id: AccountId,
    /// The year of the billing cycle.
    pub year: i32,
    /// The zero-based month of the billing cycle.
    pub month: u8,
    /// The amount owed in cents.
    pub amount: i64,
    /// Whether the invoice has been settled.
    pub is_paid: bool,
    /// When the invoice was settled.
    pub payment_date: Option<OffsetDateTime>,
}

/// The derived state of an invoice. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Purchases are still being added.
    Open,
    /// Past the close date, waiting for payment.
    Closed,
    /// Past the due date and not paid.
    Late,
    /// Settled.
    Paid,
}

/// The number of months between an invoice's nominal month and the month its
/// due date falls in.
///
/// When the pay day comes before the close day in the calendar, the invoice is
/// paid in the month after it closes.
pub fn billing_cycle_offset(pay_day: u8, close_day: u8) -> i32 {
    if pay_day < close_day { 2 } else { 1 }
}

/// The close and due dates of a billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDates {
    /// The day purchases stop being added to the invoice.
    pub close: Date,
    /// The day the invoice must be paid by.
    pub due: Date,
}

impl InvoiceDates {
    /// Work out the dates for the invoice of the zero-based `month` of `year`.
    ///
    /// Days past the end of a month roll into the next month, e.g. a close day
    /// of 31 closes February's invoice on the 2nd or 3rd of March.
    ///
    /// # Errors
    /// Returns [Error::DateOutOfRange] if a date cannot be represented.
    pub fn for_cycle(year: i32, month: u8, pay_day: u8, close_day: u8) -> Result<Self, Error> {
        let month = i32::from(month);
        let offset = billing_cycle_offset(pay_day, close_day);

        Ok(Self {
            close: date_from_parts(year, month + 1, close_day)?,
            due: date_from_parts(year, month + offset, pay_day)?,
        })
    }

    /// The status of an invoice with these dates at local time `now`.
    pub fn status(&self, is_paid: bool, now: PrimitiveDateTime) -> InvoiceStatus {
        if is_paid {
            InvoiceStatus::Paid
        } else if now > self.due.midnight() {
            InvoiceStatus::Late
        } else if now > self.close.midnight() {
            InvoiceStatus::Closed
        } else {
            InvoiceStatus::Open
        }
    }
}

/// The status of `invoice` at local time `now`, using the pay and close days
/// of the `account` it belongs to.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if the invoice dates cannot be represented.
pub fn invoice_status(
    invoice: &CreditCardInvoice,
    account: &BankingAccount,
    now: PrimitiveDateTime,
) -> Result<InvoiceStatus, Error> {
    let dates = InvoiceDates::for_cycle(
        invoice.year,
        invoice.month,
        account.pay_day,
        account.close_day,
    )?;

    Ok(dates.status(invoice.is_paid, now))
}

/// The billing cycle, as (year, zero-based month), that a credit card purchase
/// made on `date` is added to.
///
/// This is the cycle with the earliest close date after `date`. A purchase made
/// on the close day goes on the next invoice.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if the cycle's dates cannot be represented.
pub fn billing_cycle_for_purchase(date: Date, close_day: u8) -> Result<(i32, u8), Error> {
    for delta in -1..=1 {
        let (year, month) = shift_month(date.year(), month_index(date), delta);
        let close = date_from_parts(year, i32::from(month) + 1, close_day)?;

        if date < close {
            return Ok((year, month));
        }
    }

    Ok(shift_month(date.year(), month_index(date), 2))
}

/// The billing cycle, as (year, zero-based month), whose invoice is due on
/// `today` for an account with the given pay and close days.
pub fn billing_cycle_due_on(today: Date, pay_day: u8, close_day: u8) -> (i32, u8) {
    shift_month(
        today.year(),
        month_index(today),
        1 - billing_cycle_offset(pay_day, close_day),
    )
}

/// Create the credit card invoice table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_invoice_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS credit_card_invoice (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            banking_account_id INTEGER NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL CHECK (month BETWEEN 0 AND 11),
            amount INTEGER NOT NULL DEFAULT 0,
            is_paid INTEGER NOT NULL DEFAULT 0,
            payment_date TEXT,
            UNIQUE(banking_account_id, year, month),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(banking_account_id) REFERENCES banking_account(id)
                ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

pub(crate) const INVOICE_COLUMNS: &str =
    "id, user_id, banking_account_id, year, month, amount, is_paid, payment_date";

pub(crate) fn map_invoice_row(row: &Row) -> Result<CreditCardInvoice, rusqlite::Error> {
    Ok(CreditCardInvoice {
        id: row.get(0)?,
        user_id: row.get(1)?,
        banking_account_id: row.get(2)?,
        year: row.get(3)?,
        month: row.get(4)?,
        amount: row.get(5)?,
        is_paid: row.get(6)?,
        payment_date: row.get(7)?,
    })
}

/// Get one of the user's invoices.
///
/// # Errors
/// Returns [Error::InvoiceNotFound] if the invoice does not exist or belongs to
/// another user, or [Error::SqlError] on any other SQL error.
pub fn get_invoice(
    id: InvoiceId,
    user_id: UserID,
    connection: &Connection,
) -> Result<CreditCardInvoice, Error> {
    connection
        .prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM credit_card_invoice WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id), map_invoice_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::InvoiceNotFound,
            error => error.into(),
        })
}

/// Get the invoice of an account for a billing cycle, if one has been opened.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_invoice_for_cycle(
    banking_account_id: AccountId,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Option<CreditCardInvoice>, Error> {
    connection
        .prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM credit_card_invoice
             WHERE banking_account_id = ?1 AND year = ?2 AND month = ?3"
        ))?
        .query_row((banking_account_id, year, month), map_invoice_row)
        .optional()
        .map_err(Error::from)
}

/// Get the user's invoices, optionally only those of one account, newest cycle first.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_invoices(
    user_id: UserID,
    banking_account_id: Option<AccountId>,
    connection: &Connection,
) -> Result<Vec<CreditCardInvoice>, Error> {
    connection
        .prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM credit_card_invoice
             WHERE user_id = ?1 AND (?2 IS NULL OR banking_account_id = ?2)
             ORDER BY year DESC, month DESC, banking_account_id"
        ))?
        .query_map((user_id, banking_account_id), map_invoice_row)?
        .map(|maybe_invoice| maybe_invoice.map_err(Error::from))
        .collect()
}

/// Add `delta` cents to the account's invoice for a billing cycle, opening the
/// invoice if needed. Use a negative `delta` to take a purchase back off.
///
/// Run inside the database transaction that records or deletes the purchase.
///
/// # Errors
/// This function will return a:
/// - [Error::AlreadyPaid] if the invoice for the cycle has been settled,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn add_purchase_to_invoice(
    account: &BankingAccount,
    (year, month): (i32, u8),
    delta: i64,
    connection: &Connection,
) -> Result<InvoiceId, Error> {
    match get_invoice_for_cycle(account.id, year, month, connection)? {
        Some(invoice) if invoice.is_paid => Err(Error::AlreadyPaid),
        Some(invoice) => {
            connection.execute(
                "UPDATE credit_card_invoice SET amount = amount + ?1 WHERE id = ?2",
                (delta, invoice.id),
            )?;
            Ok(invoice.id)
        }
        None => connection
            .query_row(
                "INSERT INTO credit_card_invoice (user_id, banking_account_id, year, month, amount)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                (account.user_id, account.id, year, month, delta),
                |row| row.get(0),
            )
            .map_err(Error::from),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use crate::{
        Error,
        invoice::{
            InvoiceDates, InvoiceStatus, add_purchase_to_invoice, billing_cycle_due_on,
            billing_cycle_for_purchase, billing_cycle_offset, get_invoice, get_invoice_for_cycle,
            get_invoices, invoice_status,
        },
        test_utils::{get_test_connection, must_create_account, must_create_user},
    };

    #[test]
    fn pay_day_before_close_day_is_due_two_months_on() {
        let dates = InvoiceDates::for_cycle(2024, 0, 5, 20).unwrap();

        assert_eq!(billing_cycle_offset(5, 20), 2);
        assert_eq!(dates.close, date!(2024 - 01 - 20));
        assert_eq!(dates.due, date!(2024 - 02 - 05));
    }

    #[test]
    fn pay_day_after_close_day_is_due_one_month_on() {
        let dates = InvoiceDates::for_cycle(2024, 0, 25, 10).unwrap();

        assert_eq!(billing_cycle_offset(25, 10), 1);
        assert_eq!(dates.close, date!(2024 - 01 - 10));
        assert_eq!(dates.due, date!(2024 - 01 - 25));
    }

    #[test]
    fn december_invoice_is_due_next_year() {
        let dates = InvoiceDates::for_cycle(2024, 11, 5, 20).unwrap();

        assert_eq!(dates.close, date!(2024 - 12 - 20));
        assert_eq!(dates.due, date!(2025 - 01 - 05));
    }

    #[test]
    fn close_day_past_month_end_rolls_over() {
        let dates = InvoiceDates::for_cycle(2023, 1, 10, 31).unwrap();

        assert_eq!(dates.close, date!(2023 - 03 - 03));
    }

    #[test]
    fn status_follows_dates_in_priority_order() {
        let dates = InvoiceDates::for_cycle(2024, 0, 5, 20).unwrap();

        assert_eq!(
            dates.status(false, datetime!(2024 - 01 - 20 00:00)),
            InvoiceStatus::Open
        );
        assert_eq!(
            dates.status(false, datetime!(2024 - 01 - 20 00:01)),
            InvoiceStatus::Closed
        );
        assert_eq!(
            dates.status(false, datetime!(2024 - 02 - 05 09:00)),
            InvoiceStatus::Late
        );
        assert_eq!(
            dates.status(true, datetime!(2024 - 02 - 05 09:00)),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn purchases_go_on_the_next_closing_invoice() {
        assert_eq!(billing_cycle_for_purchase(date!(2024 - 01 - 19), 20), Ok((2024, 0)));
        assert_eq!(billing_cycle_for_purchase(date!(2024 - 01 - 20), 20), Ok((2024, 1)));
        assert_eq!(billing_cycle_for_purchase(date!(2024 - 12 - 25), 20), Ok((2025, 0)));
        // February's invoice closes on 2024-03-02 when the close day is 31.
        assert_eq!(billing_cycle_for_purchase(date!(2024 - 03 - 01), 31), Ok((2024, 1)));
    }

    #[test]
    fn cycle_due_today_matches_due_date() {
        assert_eq!(billing_cycle_due_on(date!(2024 - 02 - 05), 5, 20), (2024, 0));
        assert_eq!(billing_cycle_due_on(date!(2024 - 01 - 25), 25, 10), (2024, 0));
        assert_eq!(billing_cycle_due_on(date!(2024 - 01 - 05), 5, 20), (2023, 11));
    }

    #[test]
    fn purchases_accumulate_on_one_invoice() {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);
        let account = must_create_account(user_id, "Visa", 5, 20, &conn);

        let first = add_purchase_to_invoice(&account, (2024, 0), 1_000, &conn).unwrap();
        let second = add_purchase_to_invoice(&account, (2024, 0), 500, &conn).unwrap();

        assert_eq!(first, second);
        let invoice = get_invoice_for_cycle(account.id, 2024, 0, &conn)
            .unwrap()
            .unwrap();
        assert_eq!(invoice.amount, 1_500);
        assert!(!invoice.is_paid);
        assert_eq!(
            invoice_status(&invoice, &account, datetime!(2024 - 01 - 10 12:00)),
            Ok(InvoiceStatus::Open)
        );
    }

    #[test]
    fn paid_invoice_rejects_purchases() {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);
        let account = must_create_account(user_id, "Visa", 5, 20, &conn);
        let id = add_purchase_to_invoice(&account, (2024, 0), 1_000, &conn).unwrap();
        conn.execute(
            "UPDATE credit_card_invoice SET is_paid = 1 WHERE id = ?1",
            (id,),
        )
        .unwrap();

        assert_eq!(
            add_purchase_to_invoice(&account, (2024, 0), 1_000, &conn),
            Err(Error::AlreadyPaid)
        );
    }

    #[test]
    fn invoices_are_scoped_to_owner() {
        let conn = get_test_connection();
        let alice = must_create_user(&conn);
        let bob = must_create_user(&conn);
        let visa = must_create_account(alice, "Visa", 5, 20, &conn);
        let amex = must_create_account(alice, "Amex", 10, 1, &conn);
        let id = add_purchase_to_invoice(&visa, (2024, 0), 1_000, &conn).unwrap();
        add_purchase_to_invoice(&visa, (2024, 1), 1_000, &conn).unwrap();
        add_purchase_to_invoice(&amex, (2024, 0), 1_000, &conn).unwrap();

        assert_eq!(get_invoice(id, bob, &conn), Err(Error::InvoiceNotFound));
        assert_eq!(get_invoices(alice, None, &conn).unwrap().len(), 3);
        assert_eq!(get_invoices(alice, Some(visa.id), &conn).unwrap().len(), 2);
        assert!(get_invoices(bob, None, &conn).unwrap().is_empty());
    }
}
