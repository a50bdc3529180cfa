//! Banking accounts hold a balance and the pay/close days of the credit card
//! attached to them.

mod core;
mod create_endpoint;
mod list_endpoint;

pub use core::{
    BankingAccount, adjust_account_balance, create_account_table, get_account, get_accounts,
    get_automatic_debit_accounts, get_total_account_balance, map_row_to_account,
};
pub use create_endpoint::{AccountForm, create_account, create_account_endpoint};
pub use list_endpoint::get_accounts_endpoint;
