//! Background synchronization worker.
//!
//! One pass per interval: for every tracked project, take a current-moment
//! snapshot, refresh sprint metadata, then backfill each sprint whose issue
//! data has gone stale. Failures are logged per project and per sprint; one
//! bad project never stalls the rest of the pass.

use chrono::Utc;
use diesel::{
    PgConnection,
    r2d2::{self, ConnectionManager as DbConnectionManager},
};
use std::sync::Arc;
use std::time::Duration;

use teampulse_backend::config::Config;
use teampulse_backend::db::DbPool;
use teampulse_backend::db::models::activity::{Activity, JiraProject};
use teampulse_backend::db::repositories::activities::ActivitiesRepo;
use teampulse_backend::db::repositories::sprints::SprintsRepo;
use teampulse_backend::error::AppResult;
use teampulse_backend::init_tracing;
use teampulse_backend::services::jira::client::{JiraHttpClient, TrackerClient};
use teampulse_backend::services::jira::sync::JiraSync;

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("Invalid configuration");
    init_tracing(&config);

    let manager = DbConnectionManager::<PgConnection>::new(&config.database_url);
    let db: DbPool = r2d2::Pool::builder()
        .max_size(config.database_max_connections)
        .build(manager)
        .expect("Failed to create database connection pool");

    let tracker: Arc<dyn TrackerClient> = Arc::new(JiraHttpClient::new(&config));
    let interval = Duration::from_secs(config.sync_interval_secs);

    tracing::info!(interval_secs = config.sync_interval_secs, "Sync worker started");

    loop {
        if let Err(e) = run_pass(&db, tracker.clone(), &config).await {
            tracing::error!(error = %e, "Sync pass aborted");
        }
        tokio::time::sleep(interval).await;
    }
}

async fn run_pass(db: &DbPool, tracker: Arc<dyn TrackerClient>, config: &Config) -> AppResult<()> {
    let sync = JiraSync::connect(tracker, config).await?;
    let mut conn = db.get()?;

    let projects = ActivitiesRepo::list_synced_projects(&mut conn)?;
    tracing::info!(projects = projects.len(), "Sync pass started");

    for (project, activity) in &projects {
        if let Err(e) = sync_project(&sync, &mut conn, activity, project).await {
            tracing::error!(
                project = %project.project_key,
                error = %e,
                "Project sync failed"
            );
        }
    }

    Ok(())
}

async fn sync_project(
    sync: &JiraSync,
    conn: &mut PgConnection,
    activity: &Activity,
    project: &JiraProject,
) -> AppResult<()> {
    let now = Utc::now();
    sync.snapshot_project(conn, activity, project, now).await?;
    sync.sync_all_sprints(conn, activity, project, now).await?;

    for sprint in SprintsRepo::list_by_activity(conn, activity.activity_id)? {
        let now = Utc::now();
        if !sprint.should_be_updated(now) {
            continue;
        }
        // Active sprints get the cheap latest-only sample; anything else
        // that is due needs the full backfill.
        let latest_only = sprint.is_active();
        if let Err(e) = sync.sync_sprint_issues(conn, &sprint, latest_only, now).await {
            tracing::error!(
                sprint_id = sprint.sprint_id,
                error = %e,
                "Sprint sync failed"
            );
        }
    }

    Ok(())
}
