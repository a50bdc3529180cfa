//! Transactions and the ledger that records them.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the `NewTransaction` builder
//! - The ledger functions that record and delete transactions together with
//!   their history rows, account balances and card invoices
//! - The JSON endpoints for transactions

mod core;
mod create_endpoint;
mod delete_endpoint;
mod ledger;
mod list_endpoint;

pub use core::{
    NewTransaction, PaymentMethod, Transaction, TransactionFilter, TransactionType,
    create_transaction_table, get_transaction, get_transactions, map_transaction_row,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use ledger::{delete_transaction, record_transaction};
pub use list_endpoint::get_transactions_endpoint;

#[cfg(test)]
pub use core::count_transactions;
