pub mod health;
pub mod overtime;
pub mod snapshots;
pub mod sprints;
pub mod status_mappings;
pub mod teams;

use crate::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/me/teams", get(teams::my_teams))
        .route(
            "/departments/:department_id/teams",
            get(teams::department_teams),
        )
        .route("/teams", get(teams::list_teams))
        .route("/teams", post(teams::create_team))
        .route("/teams/:team_id/members", post(teams::grant_team_role))
        .route(
            "/activities/:activity_id/sprints",
            get(sprints::activity_sprints),
        )
        .route("/sprints/:sprint_id/sync", post(sprints::sync_sprint))
        .route(
            "/sprints/:sprint_id/snapshots",
            get(snapshots::sprint_snapshots),
        )
        .route(
            "/projects/:project_id/snapshot",
            post(sprints::snapshot_project),
        )
        .route(
            "/projects/:project_id/sync-sprints",
            post(sprints::sync_project_sprints),
        )
        .route(
            "/status-mappings",
            put(status_mappings::upsert_status_mapping),
        )
        .route(
            "/status-mappings",
            get(status_mappings::list_status_mappings),
        )
        .route("/overtime/import", post(overtime::import_overtime))
        .with_state(state)
}
