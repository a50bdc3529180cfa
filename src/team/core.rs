use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{Error, UserID, database_id::TeamId};

/// A group of users that share transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// The ID of the team.
    pub id: TeamId,
    /// The display name of the team.
    pub name: String,
    /// The user that created the team and manages its members.
    pub owner_id: UserID,
}

/// A user's membership of a team and their share of its money.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    /// The team.
    pub team_id: TeamId,
    /// The member.
    pub user_id: UserID,
    /// The member's share of team income and expenses, 0-100.
    pub percentage: u8,
}

/// One member's part of a team's monthly totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberShare {
    /// The member.
    pub user_id: UserID,
    /// The member's share in percent.
    pub percentage: u8,
    /// The member's share of the team income in cents, rounded down.
    pub income: i64,
    /// The member's share of the team expenses in cents, rounded down.
    pub expense: i64,
}

/// How a team's income and expenses for a month split between its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSplit {
    /// The team.
    pub team_id: TeamId,
    /// The year.
    pub year: i32,
    /// The zero-based month.
    pub month: u8,
    /// The team's total income for the month in cents.
    pub income: i64,
    /// The team's total expenses for the month in cents.
    pub expense: i64,
    /// Each member's share.
    pub members: Vec<MemberShare>,
}

/// Create the team and team member tables.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_team_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS team (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            owner_id INTEGER NOT NULL,
            FOREIGN KEY(owner_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS team_member (
            team_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            percentage INTEGER NOT NULL CHECK (percentage BETWEEN 0 AND 100),
            PRIMARY KEY(team_id, user_id),
            FOREIGN KEY(team_id) REFERENCES team(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_member_row(row: &Row) -> Result<TeamMember, rusqlite::Error> {
    Ok(TeamMember {
        team_id: row.get(0)?,
        user_id: row.get(1)?,
        percentage: row.get(2)?,
    })
}

/// Create a team owned by `owner_id`, who joins it with `owner_percentage`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the name is blank,
/// - [Error::InvalidPercentage] if `owner_percentage` is over 100,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_team(
    owner_id: UserID,
    name: &str,
    owner_percentage: u8,
    connection: &Connection,
) -> Result<Team, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    if owner_percentage > 100 {
        return Err(Error::InvalidPercentage(owner_percentage.into()));
    }

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let team = transaction
        .prepare("INSERT INTO team (name, owner_id) VALUES (?1, ?2) RETURNING id, name, owner_id")?
        .query_row((name, owner_id), |row| {
            Ok(Team {
                id: row.get(0)?,
                name: row.get(1)?,
                owner_id: row.get(2)?,
            })
        })?;

    transaction.execute(
        "INSERT INTO team_member (team_id, user_id, percentage) VALUES (?1, ?2, ?3)",
        (team.id, owner_id, owner_percentage),
    )?;

    transaction.commit()?;

    Ok(team)
}

fn get_team_owner(team_id: TeamId, connection: &Connection) -> Result<Option<UserID>, Error> {
    connection
        .query_row(
            "SELECT owner_id FROM team WHERE id = ?1",
            (team_id,),
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
}

/// Add `user_id` to the team with `percentage` of its money.
///
/// Only the owner may add members.
///
/// # Errors
/// This function will return a:
/// - [Error::TeamNotFound] if the team does not exist or `acting_user_id` is not a member,
/// - [Error::Forbidden] if `acting_user_id` is a member but not the owner,
/// - [Error::InvalidPercentage] if the team's percentages would add up to over 100,
/// - [Error::DuplicateTeamMember] if `user_id` is already a member,
/// - [Error::NotFound] if `user_id` is not a known user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn add_team_member(
    team_id: TeamId,
    acting_user_id: UserID,
    user_id: UserID,
    percentage: u8,
    connection: &Connection,
) -> Result<TeamMember, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    match get_team_owner(team_id, &transaction)? {
        Some(owner_id) if owner_id == acting_user_id => {}
        Some(_) if is_team_member(team_id, acting_user_id, &transaction)? => {
            return Err(Error::Forbidden);
        }
        _ => return Err(Error::TeamNotFound),
    }

    let allocated: u32 = transaction.query_row(
        "SELECT COALESCE(SUM(percentage), 0) FROM team_member WHERE team_id = ?1",
        (team_id,),
        |row| row.get(0),
    )?;
    let total = allocated + u32::from(percentage);
    if total > 100 {
        return Err(Error::InvalidPercentage(total));
    }

    let member = transaction
        .prepare(
            "INSERT INTO team_member (team_id, user_id, percentage) VALUES (?1, ?2, ?3)
             RETURNING team_id, user_id, percentage",
        )?
        .query_row((team_id, user_id, percentage), map_member_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
                },
                _,
            ) => Error::DuplicateTeamMember,
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })?;

    transaction.commit()?;

    Ok(member)
}

/// Whether `user_id` belongs to the team.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn is_team_member(
    team_id: TeamId,
    user_id: UserID,
    connection: &Connection,
) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM team_member WHERE team_id = ?1 AND user_id = ?2)",
            (team_id, user_id),
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// Get the members of a team ordered by user ID.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_team_members(team_id: TeamId, connection: &Connection) -> Result<Vec<TeamMember>, Error> {
    connection
        .prepare(
            "SELECT team_id, user_id, percentage FROM team_member
             WHERE team_id = ?1 ORDER BY user_id",
        )?
        .query_map((team_id,), map_member_row)?
        .map(|maybe_member| maybe_member.map_err(Error::from))
        .collect()
}

/// Split the team's income and expenses for a month between its members.
///
/// The totals come from the year rollup rows attributed to the team.
///
/// # Errors
/// This function will return a:
/// - [Error::TeamNotFound] if `user_id` is not a member of the team,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_team_split(
    team_id: TeamId,
    user_id: UserID,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<TeamSplit, Error> {
    if !is_team_member(team_id, user_id, connection)? {
        return Err(Error::TeamNotFound);
    }

    let (income, expense): (i64, i64) = connection.query_row(
        "SELECT COALESCE(SUM(income), 0), COALESCE(SUM(expense), 0) FROM year_history
         WHERE team_id = ?1 AND year = ?2 AND month = ?3",
        (team_id, year, month),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let members = get_team_members(team_id, connection)?
        .into_iter()
        .map(|member| MemberShare {
            user_id: member.user_id,
            percentage: member.percentage,
            income: income * i64::from(member.percentage) / 100,
            expense: expense * i64::from(member.percentage) / 100,
        })
        .collect();

    Ok(TeamSplit {
        team_id,
        year,
        month,
        income,
        expense,
        members,
    })
}
