use chrono::NaiveDate;
use diesel::prelude::*;

use crate::db::models::overtime::NewOvertimeMeasurement;

pub struct OvertimeRepo;

impl OvertimeRepo {
    pub fn delete_periods(
        conn: &mut PgConnection,
        periods: &[NaiveDate],
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::overtime_measurements::dsl::*;
        diesel::delete(overtime_measurements.filter(measurement_date.eq_any(periods)))
            .execute(conn)
    }

    pub fn insert_batch(
        conn: &mut PgConnection,
        batch: &[NewOvertimeMeasurement],
    ) -> Result<usize, diesel::result::Error> {
        diesel::insert_into(crate::schema::overtime_measurements::table)
            .values(batch)
            .execute(conn)
    }
}
