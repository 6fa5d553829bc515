use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::AppState;
use crate::db::models::api::ApiResponse;
use crate::db::models::user::User;
use crate::db::repositories::activities::ActivitiesRepo;
use crate::db::repositories::snapshots::SnapshotsRepo;
use crate::db::repositories::sprints::SprintsRepo;
use crate::error::{AppError, AppResult};
use crate::services::permissions::PermissionsService;
use crate::services::status_categories::StatusCategoryService;

/// Snapshot history of one sprint, with each row's status category resolved
/// through the mapping table at read time.
pub async fn sprint_snapshots(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(sprint_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    let sprint = SprintsRepo::find_by_id(&mut conn, sprint_id)?
        .ok_or_else(|| AppError::not_found("sprint"))?;
    let activity = ActivitiesRepo::find_by_id(&mut conn, sprint.activity_id)?
        .ok_or_else(|| AppError::not_found("activity"))?;

    if !user.is_superadmin {
        let team_id = activity
            .team_id
            .ok_or_else(|| AppError::forbidden("Activity is not assigned to a team"))?;
        let resolved = PermissionsService::for_user(&mut conn, &user)?;
        if !resolved.can_read(team_id) {
            return Err(AppError::forbidden("No read access to this sprint's team"));
        }
    }

    let snapshots = SnapshotsRepo::list_by_sprint(&mut conn, sprint_id)?;
    let annotated =
        StatusCategoryService::annotate(&mut conn, snapshots, Some(activity.activity_id))?;

    Ok(Json(ApiResponse::success(annotated, "Snapshots retrieved")))
}
