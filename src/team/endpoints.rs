//! Route handlers for creating teams, adding members and reading the split.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, UserID,
    database_id::TeamId,
    team::{TeamSplit, add_team_member, create_team, get_team_split},
};

/// The state needed to manage teams.
#[derive(Debug, Clone)]
pub struct TeamState {
    /// The database connection for managing teams.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TeamState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamForm {
    /// The team name.
    pub name: String,
    /// The creator's share of the team's money, defaults to 100.
    #[serde(default = "default_owner_percentage")]
    pub percentage: u8,
}

fn default_owner_percentage() -> u8 {
    100
}

/// The request body for adding a member to a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMemberForm {
    /// The user to add.
    pub user_id: UserID,
    /// The new member's share of the team's money.
    pub percentage: u8,
}

/// Query parameters selecting the month to split.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitQuery {
    /// The year.
    pub year: i32,
    /// The zero-based month.
    pub month: u8,
}

fn lock(state: &TeamState) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
    state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// A route handler for creating a team owned by the current user.
pub async fn create_team_endpoint(
    State(state): State<TeamState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<TeamForm>,
) -> Response {
    let connection = match lock(&state) {
        Ok(connection) => connection,
        Err(error) => return error.into_response(),
    };

    match create_team(user_id, &form.name, form.percentage, &connection) {
        Ok(team) => (StatusCode::CREATED, Json(team)).into_response(),
        Err(error) => {
            tracing::warn!("Could not create team {form:?}: {error}");
            error.into_response()
        }
    }
}

/// A route handler for the team owner to add a member.
pub async fn add_team_member_endpoint(
    State(state): State<TeamState>,
    Extension(user_id): Extension<UserID>,
    Path(team_id): Path<TeamId>,
    Json(form): Json<TeamMemberForm>,
) -> Response {
    let connection = match lock(&state) {
        Ok(connection) => connection,
        Err(error) => return error.into_response(),
    };

    match add_team_member(team_id, user_id, form.user_id, form.percentage, &connection) {
        Ok(member) => (StatusCode::CREATED, Json(member)).into_response(),
        Err(error) => {
            tracing::warn!("Could not add {form:?} to team {team_id}: {error}");
            error.into_response()
        }
    }
}

/// A route handler for a member to see how a month's team totals split.
pub async fn get_team_split_endpoint(
    State(state): State<TeamState>,
    Extension(user_id): Extension<UserID>,
    Path(team_id): Path<TeamId>,
    Query(query): Query<SplitQuery>,
) -> Result<Json<TeamSplit>, Error> {
    let connection = lock(&state)?;

    get_team_split(team_id, user_id, query.year, query.month, &connection).map(Json)
}
