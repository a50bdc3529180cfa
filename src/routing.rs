//! Application router configuration with user, scheduler and open route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;

use crate::{
    AppState,
    account::{create_account_endpoint, get_accounts_endpoint},
    auth::auth_guard,
    category::{create_category_endpoint, get_categories_endpoint},
    endpoints,
    invoice::{get_invoices_endpoint, pay_invoice_endpoint},
    recurring::{create_recurring_endpoint, delete_recurring_endpoint, get_recurring_endpoint},
    scheduler::{run_recurring_endpoint, scheduler_guard, sweep_automatic_debits_endpoint},
    statistics::{
        get_balance_summary_endpoint, get_category_breakdown_endpoint, get_month_history_endpoint,
        get_year_history_endpoint,
    },
    team::{add_team_member_endpoint, create_team_endpoint, get_team_split_endpoint},
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new().route(endpoints::COFFEE, get(get_coffee));

    let user_routes = Router::new()
        .route(
            endpoints::CATEGORIES,
            get(get_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::ACCOUNTS,
            get(get_accounts_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION, delete(delete_transaction_endpoint))
        .route(
            endpoints::RECURRING,
            get(get_recurring_endpoint).post(create_recurring_endpoint),
        )
        .route(
            endpoints::RECURRING_TRANSACTION,
            delete(delete_recurring_endpoint),
        )
        .route(endpoints::INVOICES, get(get_invoices_endpoint))
        .route(endpoints::PAY_INVOICE, post(pay_invoice_endpoint))
        .route(endpoints::TEAMS, post(create_team_endpoint))
        .route(endpoints::TEAM_MEMBERS, post(add_team_member_endpoint))
        .route(endpoints::TEAM_SPLIT, get(get_team_split_endpoint))
        .route(endpoints::MONTH_STATISTICS, get(get_month_history_endpoint))
        .route(endpoints::YEAR_STATISTICS, get(get_year_history_endpoint))
        .route(
            endpoints::CATEGORY_STATISTICS,
            get(get_category_breakdown_endpoint),
        )
        .route(
            endpoints::BALANCE_STATISTICS,
            get(get_balance_summary_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let scheduler_routes = Router::new()
        .route(endpoints::CRON_RECURRING, post(run_recurring_endpoint))
        .route(
            endpoints::CRON_AUTOMATIC_DEBITS,
            post(sweep_automatic_debits_endpoint),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            scheduler_guard,
        ));

    user_routes
        .merge(scheduler_routes)
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Json(json!({ "message": "I'm a teapot" }))).into_response()
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "the requested route does not exist" })),
    )
        .into_response()
}
