use diesel::prelude::*;

use crate::db::models::snapshot::{IssueSnapshot, NewIssueSnapshot};

pub struct SnapshotsRepo;

impl SnapshotsRepo {
    pub fn insert_batch(
        conn: &mut PgConnection,
        batch: &[NewIssueSnapshot],
    ) -> Result<usize, diesel::result::Error> {
        diesel::insert_into(crate::schema::issue_snapshots::table)
            .values(batch)
            .execute(conn)
    }

    pub fn list_by_sprint(
        conn: &mut PgConnection,
        sprint_id_val: i32,
    ) -> Result<Vec<IssueSnapshot>, diesel::result::Error> {
        use crate::schema::issue_snapshots::dsl::*;
        issue_snapshots
            .filter(sprint_id.eq(sprint_id_val))
            .order((snapshot_date.asc(), issue_id.asc()))
            .load::<IssueSnapshot>(conn)
    }
}
