//! Read models over the ledger: history rollups, category totals and balances.

mod core;
mod endpoints;

pub use core::{BalanceSummary, CategoryTotal, get_balance_summary, get_category_breakdown};
pub use endpoints::{
    get_balance_summary_endpoint, get_category_breakdown_endpoint, get_month_history_endpoint,
    get_year_history_endpoint,
};
