use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::db::models::activity::Activity;
use crate::db::models::api::ApiResponse;
use crate::db::models::sprint::SprintInfo;
use crate::db::models::user::User;
use crate::db::repositories::activities::ActivitiesRepo;
use crate::db::repositories::sprints::SprintsRepo;
use crate::error::{AppError, AppResult};
use crate::services::jira::sync::JiraSync;
use crate::services::permissions::PermissionsService;

#[derive(Deserialize)]
pub struct SyncQuery {
    #[serde(default)]
    pub latest_only: bool,
}

#[derive(Serialize)]
pub struct SyncResult {
    pub snapshots_written: usize,
}

#[derive(Serialize)]
pub struct SprintRefreshResult {
    pub sprints_refreshed: usize,
}

/// Sync operations move data for a whole team; the member role is not
/// enough. Dataprovider accounts run the background imports and bypass the
/// team check.
fn ensure_sync_allowed(
    conn: &mut diesel::PgConnection,
    user: &User,
    activity: &Activity,
) -> AppResult<()> {
    if user.is_superadmin || user.is_dataprovider {
        return Ok(());
    }
    let team_id = activity
        .team_id
        .ok_or_else(|| AppError::forbidden("Activity is not assigned to a team"))?;
    let resolved = PermissionsService::for_user(conn, user)?;
    if !resolved.can_write(team_id) {
        return Err(AppError::forbidden("No write access to this activity's team"));
    }
    Ok(())
}

fn ensure_readable(
    conn: &mut diesel::PgConnection,
    user: &User,
    activity: &Activity,
) -> AppResult<()> {
    if user.is_superadmin {
        return Ok(());
    }
    let team_id = activity
        .team_id
        .ok_or_else(|| AppError::forbidden("Activity is not assigned to a team"))?;
    let resolved = PermissionsService::for_user(conn, user)?;
    if !resolved.can_read(team_id) {
        return Err(AppError::forbidden("No read access to this activity's team"));
    }
    Ok(())
}

pub async fn activity_sprints(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(activity_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    let activity = ActivitiesRepo::find_by_id(&mut conn, activity_id)?
        .ok_or_else(|| AppError::not_found("activity"))?;
    ensure_readable(&mut conn, &user, &activity)?;

    let now = Utc::now();
    let sprints: Vec<SprintInfo> = SprintsRepo::list_by_activity(&mut conn, activity_id)?
        .into_iter()
        .map(|sprint| SprintInfo::from_sprint(sprint, now))
        .collect();

    Ok(Json(ApiResponse::success(sprints, "Sprints retrieved")))
}

/// On-demand re-sync of one sprint's issue history.
pub async fn sync_sprint(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(sprint_id): Path<i32>,
    Query(query): Query<SyncQuery>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    let sprint = SprintsRepo::find_by_id(&mut conn, sprint_id)?
        .ok_or_else(|| AppError::not_found("sprint"))?;
    let activity = ActivitiesRepo::find_by_id(&mut conn, sprint.activity_id)?
        .ok_or_else(|| AppError::not_found("activity"))?;
    ensure_sync_allowed(&mut conn, &user, &activity)?;

    let sync = JiraSync::connect(state.tracker.clone(), &state.config).await?;
    let written = sync
        .sync_sprint_issues(&mut conn, &sprint, query.latest_only, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success(
        SyncResult {
            snapshots_written: written,
        },
        "Sprint synced",
    )))
}

/// Point-in-time snapshot of every issue in a tracker project.
pub async fn snapshot_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    let project = ActivitiesRepo::find_jira_project(&mut conn, project_id)?
        .ok_or_else(|| AppError::not_found("tracker project"))?;
    let activity = ActivitiesRepo::find_activity_for_project(&mut conn, project_id)?
        .ok_or_else(|| AppError::not_found("activity for project"))?;
    ensure_sync_allowed(&mut conn, &user, &activity)?;

    let sync = JiraSync::connect(state.tracker.clone(), &state.config).await?;
    let written = sync
        .snapshot_project(&mut conn, &activity, &project, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success(
        SyncResult {
            snapshots_written: written,
        },
        "Project snapshot taken",
    )))
}

/// Metadata-only refresh of the sprints referenced by a project's issues.
pub async fn sync_project_sprints(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    let project = ActivitiesRepo::find_jira_project(&mut conn, project_id)?
        .ok_or_else(|| AppError::not_found("tracker project"))?;
    let activity = ActivitiesRepo::find_activity_for_project(&mut conn, project_id)?
        .ok_or_else(|| AppError::not_found("activity for project"))?;
    ensure_sync_allowed(&mut conn, &user, &activity)?;

    let sync = JiraSync::connect(state.tracker.clone(), &state.config).await?;
    let refreshed = sync
        .sync_all_sprints(&mut conn, &activity, &project, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success(
        SprintRefreshResult {
            sprints_refreshed: refreshed,
        },
        "Sprint metadata refreshed",
    )))
}
