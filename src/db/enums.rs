use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::error::{AppError, AppResult};

/// Role a user holds on a team, granted explicitly per (user, team) and
/// inherited down the team tree where no explicit grant exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    TeamAdmin,
    Member,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::TeamAdmin => "team_admin",
            TeamRole::Member => "member",
        }
    }

    /// Parses a stored role value. Unknown text is a structural-integrity
    /// error: permission resolution must abort rather than guess.
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "team_admin" => Ok(TeamRole::TeamAdmin),
            "member" => Ok(TeamRole::Member),
            other => Err(AppError::structure(format!(
                "unrecognized team role `{}` in grants table",
                other
            ))),
        }
    }
}

impl FromSql<Text, Pg> for TeamRole {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "team_admin" => Ok(TeamRole::TeamAdmin),
            "member" => Ok(TeamRole::Member),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl ToSql<Text, Pg> for TeamRole {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            TeamRole::TeamAdmin => out.write_all(b"team_admin")?,
            TeamRole::Member => out.write_all(b"member")?,
        }
        Ok(IsNull::No)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum SprintState {
    Future,
    Active,
    Closed,
}

impl SprintState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintState::Future => "future",
            SprintState::Active => "active",
            SprintState::Closed => "closed",
        }
    }

    /// Parses a tracker-provided state, case-insensitively (the tracker
    /// reports `ACTIVE` in the legacy encoding and `active` in the
    /// structured one).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "future" => Some(SprintState::Future),
            "active" => Some(SprintState::Active),
            "closed" => Some(SprintState::Closed),
            _ => None,
        }
    }
}

impl FromSql<Text, Pg> for SprintState {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "future" => Ok(SprintState::Future),
            "active" => Ok(SprintState::Active),
            "closed" => Ok(SprintState::Closed),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl ToSql<Text, Pg> for SprintState {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            SprintState::Future => out.write_all(b"future")?,
            SprintState::Active => out.write_all(b"active")?,
            SprintState::Closed => out.write_all(b"closed")?,
        }
        Ok(IsNull::No)
    }
}

/// Coarse bucket a raw tracker status maps into. Never stored on snapshots;
/// resolved at read time through the status mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    ToDo,
    InProgress,
    Done,
}

impl StatusCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::ToDo => "to_do",
            StatusCategory::InProgress => "in_progress",
            StatusCategory::Done => "done",
        }
    }
}

impl FromSql<Text, Pg> for StatusCategory {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "to_do" => Ok(StatusCategory::ToDo),
            "in_progress" => Ok(StatusCategory::InProgress),
            "done" => Ok(StatusCategory::Done),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl ToSql<Text, Pg> for StatusCategory {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            StatusCategory::ToDo => out.write_all(b"to_do")?,
            StatusCategory::InProgress => out.write_all(b"in_progress")?,
            StatusCategory::Done => out.write_all(b"done")?,
        }
        Ok(IsNull::No)
    }
}
