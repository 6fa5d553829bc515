use axum::{Json, response::IntoResponse};
use serde_json::json;

use crate::db::models::api::ApiResponse;

pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::success(json!({ "status": "ok" }), "Service healthy"))
}
