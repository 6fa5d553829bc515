use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// An activity is the unit of delivery work a team owns; it may be linked to
// a tracker project, which is what the sync engine operates on.
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = crate::schema::activities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Activity {
    pub activity_id: i32,
    pub team_id: Option<i32>,
    pub activity_name: String,
    pub jira_project_id: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::activities)]
pub struct NewActivity {
    pub team_id: Option<i32>,
    pub activity_name: String,
    pub jira_project_id: Option<i32>,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = crate::schema::jira_projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JiraProject {
    pub id: i32,
    pub project_key: String,
    pub project_name: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::jira_projects)]
pub struct NewJiraProject {
    pub project_key: String,
    pub project_name: String,
}
