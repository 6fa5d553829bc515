use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Accumulated overtime of one team for the month of measurement_date.
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = crate::schema::overtime_measurements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OvertimeMeasurement {
    pub pk: i32,
    pub measurement_id: Uuid,
    pub measurement_date: NaiveDate,
    pub team_id: i32,
    pub workdays_fix: Option<i32>,
    pub workdays_actual: i32,
    pub overtime_minutes: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::overtime_measurements)]
pub struct NewOvertimeMeasurement {
    pub measurement_id: Uuid,
    pub measurement_date: NaiveDate,
    pub team_id: i32,
    pub workdays_fix: Option<i32>,
    pub workdays_actual: i32,
    pub overtime_minutes: i32,
}

/// One already-parsed import row. File parsing is the upload layer's
/// problem; the importer receives rows.
#[derive(Deserialize, Clone, Debug)]
pub struct OvertimeImportRow {
    /// Any day inside the month the measurement covers.
    pub period: NaiveDate,
    pub team_code: String,
    pub workdays_fix: Option<i32>,
    pub workdays_actual: i32,
    pub overtime_minutes: i32,
}

#[derive(Serialize)]
pub struct OvertimeImportSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub periods_replaced: Vec<NaiveDate>,
}
