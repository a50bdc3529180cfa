//! Categories label transactions, e.g. "Groceries" or "Salary", and carry the
//! icon shown next to them.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, UserID, database_id::CategoryId};

/// A user defined label for transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The user that owns the category.
    pub user_id: UserID,
    /// The name, unique per user.
    pub name: String,
    /// The icon identifier copied onto transactions in this category.
    pub icon: String,
}

/// Create the category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            icon TEXT NOT NULL,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        icon: row.get(3)?,
    })
}

/// Create a category for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if `name` is blank,
/// - [Error::DuplicateCategoryName] if the user already has a category called `name`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(
    user_id: UserID,
    name: &str,
    icon: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    connection
        .prepare(
            "INSERT INTO category (user_id, name, icon) VALUES (?1, ?2, ?3)
             RETURNING id, user_id, name, icon",
        )?
        .query_row((user_id, name, icon), map_category_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(name.to_owned()),
            error => error.into(),
        })
}

/// Look up one of the user's categories by its name.
///
/// # Errors
/// This function will return a:
/// - [Error::CategoryNotFound] if the user has no category called `name`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_category_by_name(
    user_id: UserID,
    name: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, icon FROM category WHERE user_id = ?1 AND name = ?2",
        )?
        .query_row((user_id, name), map_category_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::CategoryNotFound(name.to_owned()),
            error => error.into(),
        })
}

/// Get all of the user's categories ordered by name.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, user_id, name, icon FROM category WHERE user_id = ?1 ORDER BY name")?
        .query_map((user_id,), map_category_row)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// The state needed to list or create categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryForm {
    /// The category name.
    pub name: String,
    /// The icon identifier.
    pub icon: String,
}

/// A route handler for creating a category, responds with the new category.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<CategoryForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_category(user_id, &form.name, &form.icon, &connection) {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(error) => {
            tracing::warn!("could not create category {form:?} for user {user_id}: {error}");
            error.into_response()
        }
    }
}

/// A route handler for listing the user's categories.
pub async fn get_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_categories(user_id, &connection).map(Json)
}
