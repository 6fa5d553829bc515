//! Status category resolution and maintenance.
//!
//! Snapshots store the raw tracker status string; the coarse category is
//! resolved at read time through the mapping table, so re-categorizing a
//! status never requires touching historical rows.

use diesel::PgConnection;
use std::collections::BTreeMap;

use crate::db::enums::StatusCategory;
use crate::db::models::snapshot::{IssueSnapshot, IssueSnapshotInfo};
use crate::db::models::status_mapping::{
    NewStatusCategoryStatusMapping, StatusCategoryStatusMapping, UpsertStatusMappingRequest,
};
use crate::db::repositories::activities::ActivitiesRepo;
use crate::db::repositories::status_mappings::StatusMappingsRepo;
use crate::error::{AppError, AppResult};

pub struct StatusCategoryService;

impl StatusCategoryService {
    pub fn resolve(
        conn: &mut PgConnection,
        status: &str,
        activity_id: Option<i32>,
    ) -> AppResult<Option<StatusCategory>> {
        Ok(StatusMappingsRepo::resolve(conn, status, activity_id)?)
    }

    /// Attaches resolved categories to snapshot rows. Distinct statuses are
    /// resolved once each; unmapped statuses come back with no category
    /// rather than failing the whole read.
    pub fn annotate(
        conn: &mut PgConnection,
        snapshots: Vec<IssueSnapshot>,
        activity_id: Option<i32>,
    ) -> AppResult<Vec<IssueSnapshotInfo>> {
        let mut cache: BTreeMap<String, Option<StatusCategory>> = BTreeMap::new();

        snapshots
            .into_iter()
            .map(|snapshot| {
                let category = match cache.get(&snapshot.status) {
                    Some(cached) => *cached,
                    None => {
                        let resolved =
                            StatusMappingsRepo::resolve(conn, &snapshot.status, activity_id)?;
                        cache.insert(snapshot.status.clone(), resolved);
                        resolved
                    }
                };
                Ok(IssueSnapshotInfo {
                    id: snapshot.id,
                    sprint_id: snapshot.sprint_id,
                    issue_id: snapshot.issue_id,
                    snapshot_date: snapshot.snapshot_date,
                    status: snapshot.status,
                    status_category: category,
                    story_points: snapshot.story_points,
                })
            })
            .collect()
    }

    /// Creates or replaces a mapping. An activity-scoped mapping must point
    /// at an existing activity; the global scope needs no such check.
    pub fn upsert(
        conn: &mut PgConnection,
        request: UpsertStatusMappingRequest,
    ) -> AppResult<StatusCategoryStatusMapping> {
        if request.status.trim().is_empty() {
            return Err(AppError::validation("status must not be empty"));
        }
        if let Some(activity_id) = request.activity_id {
            ActivitiesRepo::find_by_id(conn, activity_id)?
                .ok_or_else(|| AppError::not_found("activity"))?;
        }

        let mapping = StatusMappingsRepo::upsert(
            conn,
            &NewStatusCategoryStatusMapping {
                activity_id: request.activity_id,
                status: request.status,
                status_category: request.status_category,
            },
        )?;
        Ok(mapping)
    }

    pub fn list(
        conn: &mut PgConnection,
        activity_id: Option<i32>,
    ) -> AppResult<Vec<StatusCategoryStatusMapping>> {
        Ok(StatusMappingsRepo::list_for_activity(conn, activity_id)?)
    }
}
