use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::models::sprint::{NewSprint, Sprint};

pub struct SprintsRepo;

impl SprintsRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        sprint_id_val: i32,
    ) -> Result<Option<Sprint>, diesel::result::Error> {
        use crate::schema::sprints::dsl::*;
        sprints
            .filter(sprint_id.eq(sprint_id_val))
            .first::<Sprint>(conn)
            .optional()
    }

    pub fn find_by_jira_id(
        conn: &mut PgConnection,
        jira_id: i32,
    ) -> Result<Option<Sprint>, diesel::result::Error> {
        use crate::schema::sprints::dsl::*;
        sprints
            .filter(jira_sprint_id.eq(jira_id))
            .first::<Sprint>(conn)
            .optional()
    }

    pub fn list_by_activity(
        conn: &mut PgConnection,
        activity_id_val: i32,
    ) -> Result<Vec<Sprint>, diesel::result::Error> {
        use crate::schema::sprints::dsl::*;
        sprints
            .filter(activity_id.eq(activity_id_val))
            .order(start_date.asc())
            .load::<Sprint>(conn)
    }

    /// Upsert keyed on `jira_sprint_id`. Overwrites all non-key fields, but
    /// only when the stored row is absent, never synced, or older than `dt`,
    /// so an out-of-order background job cannot regress sprint state.
    ///
    /// `last_updated` is stamped with `dt` only when `set_last_updated` is
    /// true: it tracks issue-data freshness, and a metadata-only refresh
    /// must not claim issue data is fresh.
    pub fn upsert_if_newer(
        conn: &mut PgConnection,
        new: &NewSprint,
        dt: DateTime<Utc>,
        set_last_updated: bool,
    ) -> Result<Sprint, diesel::result::Error> {
        use crate::schema::sprints;

        let jira_id = match new.jira_sprint_id {
            Some(id) => id,
            None => {
                return Err(diesel::result::Error::QueryBuilderError(
                    "sprint upsert requires a jira_sprint_id".into(),
                ));
            }
        };

        if let Some(existing) = Self::find_by_jira_id(conn, jira_id)? {
            if existing.last_updated.is_some_and(|lu| lu >= dt) {
                return Ok(existing);
            }
        }

        if set_last_updated {
            let stamped = new.stamped(dt);
            diesel::insert_into(sprints::table)
                .values(&stamped)
                .on_conflict(sprints::jira_sprint_id)
                .do_update()
                .set((
                    sprints::activity_id.eq(stamped.activity_id),
                    sprints::name.eq(&stamped.name),
                    sprints::state.eq(stamped.state),
                    sprints::start_date.eq(stamped.start_date),
                    sprints::end_date.eq(stamped.end_date),
                    sprints::complete_date.eq(stamped.complete_date),
                    sprints::last_updated.eq(stamped.last_updated),
                ))
                .get_result(conn)
        } else {
            diesel::insert_into(sprints::table)
                .values(new)
                .on_conflict(sprints::jira_sprint_id)
                .do_update()
                .set((
                    sprints::activity_id.eq(new.activity_id),
                    sprints::name.eq(&new.name),
                    sprints::state.eq(new.state),
                    sprints::start_date.eq(new.start_date),
                    sprints::end_date.eq(new.end_date),
                    sprints::complete_date.eq(new.complete_date),
                ))
                .get_result(conn)
        }
    }

    pub fn set_last_updated(
        conn: &mut PgConnection,
        sprint_id_val: i32,
        at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::sprints::dsl::*;
        diesel::update(sprints.filter(sprint_id.eq(sprint_id_val)))
            .set(last_updated.eq(Some(at)))
            .execute(conn)
    }
}
