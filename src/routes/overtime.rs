use axum::{Extension, Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::AppState;
use crate::db::models::api::ApiResponse;
use crate::db::models::overtime::OvertimeImportRow;
use crate::db::models::user::User;
use crate::error::{AppError, AppResult};
use crate::services::overtime_import::OvertimeImporter;

/// Imports a batch of monthly overtime rows, replacing every month the
/// batch touches.
pub async fn import_overtime(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(rows): Json<Vec<OvertimeImportRow>>,
) -> AppResult<impl IntoResponse> {
    if !user.is_dataprovider && !user.is_superadmin {
        return Err(AppError::forbidden("Dataprovider role required"));
    }
    if rows.is_empty() {
        return Err(AppError::validation("import contains no rows"));
    }

    let mut conn = state.db.get()?;
    let summary = OvertimeImporter::new(rows).run(&mut conn)?;

    Ok(Json(ApiResponse::success(summary, "Overtime imported")))
}
