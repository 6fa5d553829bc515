use crate::db::enums::StatusCategory;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Maps a raw tracker status string to a coarse category, either for one
// activity or globally (activity_id null). Activity-specific rows win.
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = crate::schema::status_category_status_mappings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusCategoryStatusMapping {
    pub id: i32,
    pub activity_id: Option<i32>,
    pub status: String,
    pub status_category: StatusCategory,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::status_category_status_mappings)]
pub struct NewStatusCategoryStatusMapping {
    pub activity_id: Option<i32>,
    pub status: String,
    pub status_category: StatusCategory,
}

#[derive(Deserialize)]
pub struct UpsertStatusMappingRequest {
    pub activity_id: Option<i32>,
    pub status: String,
    pub status_category: StatusCategory,
}
