//! Writing transactions together with everything derived from them.
//!
//! Recording or deleting a transaction touches the transaction table, the
//! month and year history rows, and either the banking account balance or the
//! credit card invoice. All of it happens in one database transaction.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    account::{BankingAccount, adjust_account_balance, get_account},
    category::get_category_by_name,
    database_id::TransactionId,
    history::add_to_history,
    invoice::{add_purchase_to_invoice, billing_cycle_for_purchase},
    team::is_team_member,
    transaction::{
        NewTransaction, PaymentMethod, Transaction, TransactionType,
        core::{TRANSACTION_COLUMNS, get_transaction, map_transaction_row},
    },
};

/// Record a transaction and update the history rows and account it affects.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not positive,
/// - [Error::InvalidPayment] for a credit payment that is income or has no account,
/// - [Error::CategoryNotFound] if the user has no category with the given name,
/// - [Error::TeamNotFound] if the user is not a member of the given team,
/// - [Error::AccountNotFound] if the account does not belong to the user,
/// - [Error::AlreadyPaid] if a credit purchase falls in a settled billing cycle,
/// - or [Error::SqlError] if there is some other SQL error.
///
/// Nothing is written when an error is returned.
pub fn record_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.amount <= 0 {
        return Err(Error::InvalidAmount(new_transaction.amount));
    }

    if new_transaction.payment == PaymentMethod::Credit {
        if new_transaction.transaction_type != TransactionType::Expense {
            return Err(Error::InvalidPayment("credit payments must be expenses"));
        }

        if new_transaction.banking_account_id.is_none() {
            return Err(Error::InvalidPayment(
                "credit payments must name a banking account",
            ));
        }
    }

    let user_id = new_transaction.user_id;
    let sql_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let category = get_category_by_name(user_id, &new_transaction.category, &sql_transaction)?;

    if let Some(team_id) = new_transaction.team_id {
        if !is_team_member(team_id, user_id, &sql_transaction)? {
            return Err(Error::TeamNotFound);
        }
    }

    let account = new_transaction
        .banking_account_id
        .map(|account_id| get_account(account_id, user_id, &sql_transaction))
        .transpose()?;

    let transaction = sql_transaction
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (user_id, team_id, banking_account_id, amount, type, payment,
                 category, category_icon, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                user_id,
                new_transaction.team_id,
                new_transaction.banking_account_id,
                new_transaction.amount,
                new_transaction.transaction_type,
                new_transaction.payment,
                &category.name,
                &category.icon,
                new_transaction.date,
                OffsetDateTime::now_utc(),
            ),
            map_transaction_row,
        )?;

    add_to_history(
        user_id,
        transaction.team_id,
        transaction.date,
        transaction.transaction_type,
        transaction.amount,
        &sql_transaction,
    )?;

    if let Some(account) = account {
        apply_to_account(&transaction, &account, 1, &sql_transaction)?;
    }

    sql_transaction.commit()?;

    tracing::debug!(
        "Recorded transaction {} of {} cents for user {}",
        transaction.id,
        transaction.amount,
        user_id
    );

    Ok(transaction)
}

/// Delete one of the user's transactions and take it back off the history
/// rows and the account it affected.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist or belongs to another user,
/// - [Error::AlreadyPaid] if it was a credit purchase on a settled invoice,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let sql_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let transaction = get_transaction(id, user_id, &sql_transaction)?;

    add_to_history(
        user_id,
        transaction.team_id,
        transaction.date,
        transaction.transaction_type,
        -transaction.amount,
        &sql_transaction,
    )?;

    if let Some(account_id) = transaction.banking_account_id {
        match get_account(account_id, user_id, &sql_transaction) {
            Ok(account) => apply_to_account(&transaction, &account, -1, &sql_transaction)?,
            // The account was deleted, there is no balance left to correct.
            Err(Error::AccountNotFound) => {}
            Err(error) => return Err(error),
        }
    }

    sql_transaction.execute("DELETE FROM \"transaction\" WHERE id = ?1", (id,))?;

    sql_transaction.commit()?;

    Ok(())
}

/// Move the account balance or the card invoice by the transaction amount.
///
/// `direction` is 1 when recording and -1 when deleting.
fn apply_to_account(
    transaction: &Transaction,
    account: &BankingAccount,
    direction: i64,
    connection: &Connection,
) -> Result<(), Error> {
    match transaction.payment {
        PaymentMethod::Debit => adjust_account_balance(
            account.id,
            direction * transaction.transaction_type.balance_sign() * transaction.amount,
            connection,
        ),
        PaymentMethod::Credit => {
            let cycle = billing_cycle_for_purchase(transaction.date, account.close_day)?;
            add_purchase_to_invoice(account, cycle, direction * transaction.amount, connection)
                .map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, UserID,
        account::get_account,
        history::{MonthHistory, YearHistory, get_month_history, get_year_history},
        invoice::{get_invoice_for_cycle, pay_invoice},
        team::create_team,
        test_utils::{
            get_test_connection, must_create_account, must_create_category, must_create_user,
        },
        transaction::{
            PaymentMethod, Transaction, TransactionType, count_transactions, delete_transaction,
            record_transaction,
        },
    };

    fn setup() -> (Connection, UserID) {
        let conn = get_test_connection();
        let user_id = must_create_user(&conn);
        must_create_category(user_id, "Groceries", &conn);
        must_create_category(user_id, "Salary", &conn);
        (conn, user_id)
    }

    fn sum_history(user_id: UserID, conn: &Connection) -> (i64, i64, i64, i64) {
        conn.query_row(
            "SELECT
                (SELECT COALESCE(SUM(income), 0) FROM month_history WHERE user_id = ?1),
                (SELECT COALESCE(SUM(expense), 0) FROM month_history WHERE user_id = ?1),
                (SELECT COALESCE(SUM(income), 0) FROM year_history WHERE user_id = ?1),
                (SELECT COALESCE(SUM(expense), 0) FROM year_history WHERE user_id = ?1)",
            (user_id,),
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap()
    }

    fn sum_transactions(user_id: UserID, conn: &Connection) -> (i64, i64) {
        conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN type = 'income' THEN amount END), 0),
                COALESCE(SUM(CASE WHEN type = 'expense' THEN amount END), 0)
             FROM \"transaction\" WHERE user_id = ?1",
            (user_id,),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
    }

    #[test]
    fn same_day_expenses_increment_existing_rows() {
        let (conn, user_id) = setup();
        let day = date!(2024 - 03 - 15);

        let transaction = record_transaction(
            Transaction::build(user_id, 5_000, TransactionType::Expense, "Groceries", day),
            &conn,
        )
        .unwrap();

        assert_eq!(transaction.amount, 5_000);
        assert_eq!(transaction.category_icon, "tag");
        assert_eq!(count_transactions(&conn), Ok(1));
        assert_eq!(
            get_month_history(user_id, 2024, 2, &conn).unwrap(),
            vec![MonthHistory {
                user_id,
                team_id: None,
                day: 15,
                month: 2,
                year: 2024,
                income: 0,
                expense: 5_000,
            }]
        );
        assert_eq!(
            get_year_history(user_id, 2024, &conn).unwrap(),
            vec![YearHistory {
                user_id,
                team_id: None,
                month: 2,
                year: 2024,
                income: 0,
                expense: 5_000,
            }]
        );

        record_transaction(
            Transaction::build(user_id, 2_500, TransactionType::Expense, "Groceries", day),
            &conn,
        )
        .unwrap();

        let month = get_month_history(user_id, 2024, 2, &conn).unwrap();
        let year = get_year_history(user_id, 2024, &conn).unwrap();
        assert_eq!(count_transactions(&conn), Ok(2));
        assert_eq!(month.len(), 1);
        assert_eq!(month[0].expense, 7_500);
        assert_eq!(year.len(), 1);
        assert_eq!(year[0].expense, 7_500);
    }

    #[test]
    fn history_matches_transactions_after_mixed_writes() {
        let (conn, user_id) = setup();
        let writes = [
            (1_000, TransactionType::Income, "Salary", date!(2024 - 01 - 31)),
            (250, TransactionType::Expense, "Groceries", date!(2024 - 01 - 31)),
            (400, TransactionType::Expense, "Groceries", date!(2024 - 02 - 01)),
            (90_000, TransactionType::Income, "Salary", date!(2024 - 12 - 31)),
            (75, TransactionType::Expense, "Groceries", date!(2025 - 01 - 01)),
        ];
        let mut ids = Vec::new();
        for (amount, transaction_type, category, date) in writes {
            let transaction = record_transaction(
                Transaction::build(user_id, amount, transaction_type, category, date),
                &conn,
            )
            .unwrap();
            ids.push(transaction.id);
        }
        delete_transaction(ids[2], user_id, &conn).unwrap();

        let (month_income, month_expense, year_income, year_expense) =
            sum_history(user_id, &conn);
        let (income, expense) = sum_transactions(user_id, &conn);
        assert_eq!((income, expense), (91_000, 325));
        assert_eq!((month_income, month_expense), (income, expense));
        assert_eq!((year_income, year_expense), (income, expense));
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let (conn, user_id) = setup();

        let result = record_transaction(
            Transaction::build(user_id, 0, TransactionType::Expense, "Groceries", date!(2024 - 03 - 15)),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidAmount(0)));
    }

    #[test]
    fn unknown_category_writes_nothing() {
        let (conn, user_id) = setup();

        let result = record_transaction(
            Transaction::build(user_id, 100, TransactionType::Expense, "Rent", date!(2024 - 03 - 15)),
            &conn,
        );

        assert_eq!(result, Err(Error::CategoryNotFound("Rent".to_owned())));
        assert_eq!(count_transactions(&conn), Ok(0));
        assert_eq!(sum_history(user_id, &conn), (0, 0, 0, 0));
    }

    #[test]
    fn team_must_include_user() {
        let (conn, user_id) = setup();
        let other = must_create_user(&conn);
        let team = create_team(other, "Not mine", 100, &conn).unwrap();

        let result = record_transaction(
            Transaction::build(user_id, 100, TransactionType::Expense, "Groceries", date!(2024 - 03 - 15))
                .team_id(Some(team.id)),
            &conn,
        );

        assert_eq!(result, Err(Error::TeamNotFound));
        assert_eq!(count_transactions(&conn), Ok(0));
    }

    #[test]
    fn debit_payments_move_the_balance() {
        let (conn, user_id) = setup();
        let account = must_create_account(user_id, "Checking", 5, 20, &conn);
        let day = date!(2024 - 03 - 15);

        record_transaction(
            Transaction::build(user_id, 10_000, TransactionType::Income, "Salary", day)
                .banking_account_id(Some(account.id)),
            &conn,
        )
        .unwrap();
        let expense = record_transaction(
            Transaction::build(user_id, 3_000, TransactionType::Expense, "Groceries", day)
                .banking_account_id(Some(account.id)),
            &conn,
        )
        .unwrap();

        assert_eq!(get_account(account.id, user_id, &conn).unwrap().balance, 7_000);

        delete_transaction(expense.id, user_id, &conn).unwrap();

        assert_eq!(get_account(account.id, user_id, &conn).unwrap().balance, 10_000);
    }

    #[test]
    fn credit_payments_accrue_on_invoice() {
        let (conn, user_id) = setup();
        let account = must_create_account(user_id, "Visa", 5, 20, &conn);

        for date in [date!(2024 - 01 - 10), date!(2024 - 01 - 19), date!(2024 - 01 - 20)] {
            record_transaction(
                Transaction::build(user_id, 1_000, TransactionType::Expense, "Groceries", date)
                    .banking_account_id(Some(account.id))
                    .payment(PaymentMethod::Credit),
                &conn,
            )
            .unwrap();
        }

        let january = get_invoice_for_cycle(account.id, 2024, 0, &conn)
            .unwrap()
            .unwrap();
        let february = get_invoice_for_cycle(account.id, 2024, 1, &conn)
            .unwrap()
            .unwrap();
        assert_eq!(january.amount, 2_000);
        assert_eq!(february.amount, 1_000);
        assert_eq!(get_account(account.id, user_id, &conn).unwrap().balance, 0);
    }

    #[test]
    fn credit_payments_need_an_account_and_an_expense() {
        let (conn, user_id) = setup();
        let day = date!(2024 - 01 - 10);

        assert!(matches!(
            record_transaction(
                Transaction::build(user_id, 1_000, TransactionType::Expense, "Groceries", day)
                    .payment(PaymentMethod::Credit),
                &conn,
            ),
            Err(Error::InvalidPayment(_))
        ));
        assert!(matches!(
            record_transaction(
                Transaction::build(user_id, 1_000, TransactionType::Income, "Salary", day)
                    .banking_account_id(Some(1))
                    .payment(PaymentMethod::Credit),
                &conn,
            ),
            Err(Error::InvalidPayment(_))
        ));
    }

    #[test]
    fn settled_invoice_blocks_new_purchases_and_deletes() {
        let (conn, user_id) = setup();
        let account = must_create_account(user_id, "Visa", 5, 20, &conn);
        let purchase = record_transaction(
            Transaction::build(user_id, 1_000, TransactionType::Expense, "Groceries", date!(2024 - 01 - 10))
                .banking_account_id(Some(account.id))
                .payment(PaymentMethod::Credit),
            &conn,
        )
        .unwrap();
        let invoice = get_invoice_for_cycle(account.id, 2024, 0, &conn)
            .unwrap()
            .unwrap();
        pay_invoice(invoice.id, user_id, time::OffsetDateTime::now_utc(), &conn).unwrap();

        let late_purchase = record_transaction(
            Transaction::build(user_id, 500, TransactionType::Expense, "Groceries", date!(2024 - 01 - 11))
                .banking_account_id(Some(account.id))
                .payment(PaymentMethod::Credit),
            &conn,
        );

        assert_eq!(late_purchase, Err(Error::AlreadyPaid));
        assert_eq!(delete_transaction(purchase.id, user_id, &conn), Err(Error::AlreadyPaid));
        assert_eq!(count_transactions(&conn), Ok(1));
    }

    #[test]
    fn cannot_delete_another_users_transaction() {
        let (conn, user_id) = setup();
        let other = must_create_user(&conn);
        let transaction = record_transaction(
            Transaction::build(user_id, 100, TransactionType::Expense, "Groceries", date!(2024 - 03 - 15)),
            &conn,
        )
        .unwrap();

        assert_eq!(delete_transaction(transaction.id, other, &conn), Err(Error::NotFound));
        assert_eq!(count_transactions(&conn), Ok(1));
    }
}
