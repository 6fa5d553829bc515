//! Caller identity resolution.
//!
//! Authentication itself happens upstream (SSO proxy); requests arrive with
//! the authenticated user's id in `x-user-id`. This middleware turns that
//! header into a loaded, active `User` in the request extensions, so every
//! handler works with a verified account rather than a raw header value.

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::AppState;
use crate::db::repositories::users::UsersRepo;
use crate::error::{AppError, AppResult};

pub const USER_ID_HEADER: &str = "x-user-id";

pub async fn identity<B>(
    State(state): State<Arc<AppState>>,
    mut req: Request<B>,
    next: Next<B>,
) -> AppResult<Response> {
    let user_id: i32 = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AppError::unauthorized("Missing or malformed x-user-id header"))?;

    let mut conn = state.db.get()?;
    let user = UsersRepo::find_by_id(&mut conn, user_id)?
        .ok_or_else(|| AppError::unauthorized("Unknown or inactive user"))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
