use crate::db::enums::TeamRole;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Team models
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = crate::schema::teams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Team {
    pub team_id: i32,
    pub parent_id: Option<i32>,
    pub code: String,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::teams)]
pub struct NewTeam {
    pub parent_id: Option<i32>,
    pub code: String,
    pub name: String,
}

// Explicit role grant, unique per (user, team). The only place roles are
// stored; everything else is derived by the tree walk.
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = crate::schema::user_teams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserTeam {
    pub id: i32,
    pub user_id: i32,
    pub team_id: i32,
    pub role: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::user_teams)]
pub struct NewUserTeam {
    pub user_id: i32,
    pub team_id: i32,
    pub role: String,
}

// API DTOs
#[derive(Serialize)]
pub struct TeamInfo {
    pub team_id: i32,
    pub parent_id: Option<i32>,
    pub code: String,
    pub name: String,
    pub role: Option<TeamRole>,
}

#[derive(Serialize)]
pub struct UserTeamAccess {
    pub readable_team_ids: Vec<i32>,
    pub writable_team_ids: Vec<i32>,
    pub listable_team_ids: Vec<i32>,
    pub listable_department_ids: Vec<i32>,
}

#[derive(Deserialize)]
pub struct CreateTeamRequest {
    pub parent_id: Option<i32>,
    pub code: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct GrantTeamRoleRequest {
    pub user_id: i32,
    pub role: String,
}
