use rusqlite::Connection;

use crate::{
    UserID,
    account::{AccountForm, BankingAccount, create_account},
    category::{Category, create_category},
    db::initialize,
    user::create_user,
};

pub(crate) fn get_test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&conn).expect("Could not initialize database");
    conn
}

#[track_caller]
pub(crate) fn must_create_user(connection: &Connection) -> UserID {
    create_user(connection).expect("Could not create test user")
}

#[track_caller]
pub(crate) fn must_create_category(
    user_id: UserID,
    name: &str,
    connection: &Connection,
) -> Category {
    create_category(user_id, name, "tag", connection).expect("Could not create test category")
}

#[track_caller]
pub(crate) fn must_create_account(
    user_id: UserID,
    name: &str,
    pay_day: u8,
    close_day: u8,
    connection: &Connection,
) -> BankingAccount {
    create_account(
        user_id,
        &AccountForm {
            name: name.to_owned(),
            balance: 0,
            pay_day,
            close_day,
            automatic_debit_invoices: false,
        },
        connection,
    )
    .expect("Could not create test account")
}
