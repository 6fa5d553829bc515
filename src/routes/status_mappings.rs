use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;
use crate::db::models::api::ApiResponse;
use crate::db::models::status_mapping::UpsertStatusMappingRequest;
use crate::db::models::user::User;
use crate::db::repositories::activities::ActivitiesRepo;
use crate::error::{AppError, AppResult};
use crate::services::permissions::PermissionsService;
use crate::services::status_categories::StatusCategoryService;

#[derive(Deserialize)]
pub struct ListQuery {
    pub activity_id: Option<i32>,
}

/// Creates or replaces a status mapping. Global mappings are a superadmin
/// operation; activity-scoped ones need write access to the owning team.
pub async fn upsert_status_mapping(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpsertStatusMappingRequest>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;

    match payload.activity_id {
        None => {
            if !user.is_superadmin {
                return Err(AppError::forbidden(
                    "Only superadmins may change global status mappings",
                ));
            }
        }
        Some(activity_id) => {
            if !user.is_superadmin {
                let activity = ActivitiesRepo::find_by_id(&mut conn, activity_id)?
                    .ok_or_else(|| AppError::not_found("activity"))?;
                let team_id = activity
                    .team_id
                    .ok_or_else(|| AppError::forbidden("Activity is not assigned to a team"))?;
                let resolved = PermissionsService::for_user(&mut conn, &user)?;
                if !resolved.can_write(team_id) {
                    return Err(AppError::forbidden("No write access to this activity's team"));
                }
            }
        }
    }

    let mapping = StatusCategoryService::upsert(&mut conn, payload)?;
    Ok(Json(ApiResponse::success(mapping, "Status mapping saved")))
}

/// Mappings visible in one scope: the activity's own rows plus the global
/// defaults, or only the global rows when no activity is given.
pub async fn list_status_mappings(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<User>,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    let mappings = StatusCategoryService::list(&mut conn, query.activity_id)?;
    Ok(Json(ApiResponse::success(mappings, "Status mappings retrieved")))
}
