use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;
use crate::db::enums::TeamRole;
use crate::db::models::api::ApiResponse;
use crate::db::models::team::{
    CreateTeamRequest, GrantTeamRoleRequest, NewTeam, NewUserTeam, TeamInfo, UserTeamAccess,
};
use crate::db::models::user::User;
use crate::db::repositories::teams::TeamsRepo;
use crate::db::repositories::users::UsersRepo;
use crate::error::{AppError, AppResult};
use crate::services::permissions::{PermissionsService, ResolvedPermissions};

#[derive(Serialize)]
pub struct MyTeamsResponse {
    pub access: UserTeamAccess,
    pub teams: Vec<TeamInfo>,
}

fn team_infos(
    conn: &mut diesel::PgConnection,
    resolved: &ResolvedPermissions,
    team_ids: &[i32],
) -> AppResult<Vec<TeamInfo>> {
    let teams = TeamsRepo::list_by_ids(conn, team_ids)?;
    Ok(teams
        .into_iter()
        .map(|team| {
            let role = resolved.tree.team_roles.get(&team.team_id).copied().flatten();
            TeamInfo {
                team_id: team.team_id,
                parent_id: team.parent_id,
                code: team.code,
                name: team.name,
                role,
            }
        })
        .collect())
}

/// The resolver's view of the current user: every derived access set plus
/// the listable teams with their effective roles.
pub async fn my_teams(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    let resolved = PermissionsService::for_user(&mut conn, &user)?;

    let access = UserTeamAccess {
        readable_team_ids: resolved.readable_team_ids(),
        writable_team_ids: resolved.writable_team_ids(),
        listable_team_ids: resolved.listable_team_ids(),
        listable_department_ids: resolved.listable_department_ids(),
    };
    let teams = team_infos(&mut conn, &resolved, &access.listable_team_ids)?;

    Ok(Json(ApiResponse::success(
        MyTeamsResponse { access, teams },
        "Teams retrieved",
    )))
}

/// Leaf teams of one department, restricted to what the caller can see.
pub async fn department_teams(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(department_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    let resolved = PermissionsService::for_user(&mut conn, &user)?;

    if !resolved.tree.team_children.contains_key(&department_id) {
        return Err(AppError::not_found("department"));
    }

    let team_ids = resolved.listable_department_team_ids(department_id);
    let teams = team_infos(&mut conn, &resolved, &team_ids)?;

    Ok(Json(ApiResponse::success(teams, "Department teams retrieved")))
}

pub async fn list_teams(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    let resolved = PermissionsService::for_user(&mut conn, &user)?;
    let teams = team_infos(&mut conn, &resolved, &resolved.listable_team_ids())?;
    Ok(Json(ApiResponse::success(teams, "Teams retrieved")))
}

/// Creates a team. A subtree admin may add children under teams they can
/// write; new root teams are a superadmin operation.
pub async fn create_team(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateTeamRequest>,
) -> AppResult<impl IntoResponse> {
    if payload.code.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(AppError::validation("code and name are required"));
    }

    let mut conn = state.db.get()?;
    let resolved = PermissionsService::for_user(&mut conn, &user)?;

    match payload.parent_id {
        Some(parent_id) => {
            TeamsRepo::find_by_id(&mut conn, parent_id)?
                .ok_or_else(|| AppError::not_found("parent team"))?;
            if !resolved.can_write(parent_id) {
                return Err(AppError::forbidden("No write access to the parent team"));
            }
        }
        None => {
            if !user.is_superadmin {
                return Err(AppError::forbidden("Only superadmins may create root teams"));
            }
        }
    }

    if TeamsRepo::find_by_code(&mut conn, payload.code.trim())?.is_some() {
        return Err(AppError::conflict_with_code(
            "Team code already exists",
            Some("code".to_string()),
            "DUPLICATE_CODE",
        ));
    }

    let team = TeamsRepo::insert(
        &mut conn,
        &NewTeam {
            parent_id: payload.parent_id,
            code: payload.code.trim().to_string(),
            name: payload.name.trim().to_string(),
        },
    )?;

    Ok(Json(ApiResponse::created(team, "Team created")))
}

/// Creates or replaces the explicit role grant for a user on a team.
pub async fn grant_team_role(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(team_id): Path<i32>,
    Json(payload): Json<GrantTeamRoleRequest>,
) -> AppResult<impl IntoResponse> {
    // Request input; a bad value is the caller's mistake, not corrupt state.
    if TeamRole::parse(&payload.role).is_err() {
        return Err(AppError::validation("role must be team_admin or member"));
    }

    let mut conn = state.db.get()?;
    TeamsRepo::find_by_id(&mut conn, team_id)?.ok_or_else(|| AppError::not_found("team"))?;
    UsersRepo::find_by_id(&mut conn, payload.user_id)?
        .ok_or_else(|| AppError::not_found("user"))?;

    let resolved = PermissionsService::for_user(&mut conn, &user)?;
    if !resolved.can_write(team_id) {
        return Err(AppError::forbidden("No write access to this team"));
    }

    TeamsRepo::upsert_grant(
        &mut conn,
        &NewUserTeam {
            user_id: payload.user_id,
            team_id,
            role: payload.role,
        },
    )?;

    Ok(Json(ApiResponse::<()>::success((), "Role granted")))
}
