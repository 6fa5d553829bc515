use crate::db::enums::StatusCategory;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Point-in-time fact of one issue's status and story points. Append-only:
// re-running a sync adds rows at new timestamps, never updates old ones.
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = crate::schema::issue_snapshots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IssueSnapshot {
    pub id: i32,
    pub sprint_id: Option<i32>,
    pub issue_id: i32,
    pub snapshot_date: DateTime<Utc>,
    pub status: String,
    pub story_points: f64,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = crate::schema::issue_snapshots)]
pub struct NewIssueSnapshot {
    pub sprint_id: Option<i32>,
    pub issue_id: i32,
    pub snapshot_date: DateTime<Utc>,
    pub status: String,
    pub story_points: f64,
}

// API DTO with the category resolved at read time
#[derive(Serialize)]
pub struct IssueSnapshotInfo {
    pub id: i32,
    pub sprint_id: Option<i32>,
    pub issue_id: i32,
    pub snapshot_date: DateTime<Utc>,
    pub status: String,
    pub status_category: Option<StatusCategory>,
    pub story_points: f64,
}
