//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/users/:user_id', use [format_endpoint].

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to list and create banking accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to list and record transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to list and create recurring transactions.
pub const RECURRING: &str = "/api/recurring";
/// The route to access a single recurring transaction.
pub const RECURRING_TRANSACTION: &str = "/api/recurring/{recurring_id}";
/// The route to list credit card invoices.
pub const INVOICES: &str = "/api/invoices";
/// The route to pay a credit card invoice.
pub const PAY_INVOICE: &str = "/api/invoices/{invoice_id}/pay";
/// The route to create a team.
pub const TEAMS: &str = "/api/teams";
/// The route to add a member to a team.
pub const TEAM_MEMBERS: &str = "/api/teams/{team_id}/members";
/// The route to get how a team's month splits between its members.
pub const TEAM_SPLIT: &str = "/api/teams/{team_id}/split";
/// The route for the per-day totals of a month.
pub const MONTH_STATISTICS: &str = "/api/statistics/month";
/// The route for the per-month totals of a year.
pub const YEAR_STATISTICS: &str = "/api/statistics/year";
/// The route for a month's totals per category.
pub const CATEGORY_STATISTICS: &str = "/api/statistics/categories";
/// The route for the account balance and a month's cash flow.
pub const BALANCE_STATISTICS: &str = "/api/statistics/balance";
/// The route the scheduler calls to fire the day's recurring transactions.
pub const CRON_RECURRING: &str = "/api/cron/recurring";
/// The route the scheduler calls to pay the invoices due today.
pub const CRON_AUTOMATIC_DEBITS: &str = "/api/cron/automatic-debits";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
