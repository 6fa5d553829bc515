use diesel::prelude::*;

use crate::db::models::activity::{Activity, JiraProject};

pub struct ActivitiesRepo;

impl ActivitiesRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        activity_id_val: i32,
    ) -> Result<Option<Activity>, diesel::result::Error> {
        use crate::schema::activities::dsl::*;
        activities
            .filter(activity_id.eq(activity_id_val))
            .first::<Activity>(conn)
            .optional()
    }

    pub fn find_jira_project(
        conn: &mut PgConnection,
        project_id: i32,
    ) -> Result<Option<JiraProject>, diesel::result::Error> {
        use crate::schema::jira_projects::dsl::*;
        jira_projects
            .filter(id.eq(project_id))
            .first::<JiraProject>(conn)
            .optional()
    }

    /// The activity a tracker project is tied to; sprints discovered while
    /// syncing that project land under this activity.
    pub fn find_activity_for_project(
        conn: &mut PgConnection,
        project_id: i32,
    ) -> Result<Option<Activity>, diesel::result::Error> {
        use crate::schema::activities::dsl::*;
        activities
            .filter(jira_project_id.eq(project_id))
            .first::<Activity>(conn)
            .optional()
    }

    /// Every tracker project with the activity it belongs to; the worker's
    /// scan list.
    pub fn list_synced_projects(
        conn: &mut PgConnection,
    ) -> Result<Vec<(JiraProject, Activity)>, diesel::result::Error> {
        use crate::schema::{activities, jira_projects};
        jira_projects::table
            .inner_join(activities::table)
            .select((JiraProject::as_select(), Activity::as_select()))
            .order(jira_projects::project_key.asc())
            .load::<(JiraProject, Activity)>(conn)
    }
}
