use diesel::prelude::*;

use crate::db::enums::StatusCategory;
use crate::db::models::status_mapping::{
    NewStatusCategoryStatusMapping, StatusCategoryStatusMapping,
};

pub struct StatusMappingsRepo;

impl StatusMappingsRepo {
    /// Resolves the category for a raw status string. An activity-specific
    /// mapping wins over the global (activity_id null) default; sorting on
    /// activity_id ascending puts the non-null row first (Postgres sorts
    /// nulls last).
    pub fn resolve(
        conn: &mut PgConnection,
        status_val: &str,
        activity: Option<i32>,
    ) -> Result<Option<StatusCategory>, diesel::result::Error> {
        use crate::schema::status_category_status_mappings::dsl::*;

        let mut query = status_category_status_mappings
            .filter(status.eq(status_val))
            .into_boxed();

        query = match activity {
            Some(act) => query.filter(activity_id.eq(act).or(activity_id.is_null())),
            None => query.filter(activity_id.is_null()),
        };

        query
            .order(activity_id.asc())
            .select(status_category)
            .first::<StatusCategory>(conn)
            .optional()
    }

    /// Creates or replaces the mapping row for (activity_id, status).
    /// Nulls are distinct in the unique index, so the global row is matched
    /// manually rather than through ON CONFLICT.
    pub fn upsert(
        conn: &mut PgConnection,
        new: &NewStatusCategoryStatusMapping,
    ) -> Result<StatusCategoryStatusMapping, diesel::result::Error> {
        use crate::schema::status_category_status_mappings::dsl::*;

        let existing: Option<StatusCategoryStatusMapping> = match new.activity_id {
            Some(act) => status_category_status_mappings
                .filter(status.eq(&new.status))
                .filter(activity_id.eq(act))
                .first(conn)
                .optional()?,
            None => status_category_status_mappings
                .filter(status.eq(&new.status))
                .filter(activity_id.is_null())
                .first(conn)
                .optional()?,
        };

        match existing {
            Some(row) => diesel::update(status_category_status_mappings.filter(id.eq(row.id)))
                .set(status_category.eq(new.status_category))
                .get_result(conn),
            None => diesel::insert_into(status_category_status_mappings)
                .values(new)
                .get_result(conn),
        }
    }

    pub fn list_for_activity(
        conn: &mut PgConnection,
        activity: Option<i32>,
    ) -> Result<Vec<StatusCategoryStatusMapping>, diesel::result::Error> {
        use crate::schema::status_category_status_mappings::dsl::*;

        let mut query = status_category_status_mappings.into_boxed();
        query = match activity {
            Some(act) => query.filter(activity_id.eq(act).or(activity_id.is_null())),
            None => query.filter(activity_id.is_null()),
        };
        query.order((activity_id.asc(), status.asc())).load(conn)
    }
}
