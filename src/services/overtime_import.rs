//! Monthly overtime import.
//!
//! Rows arrive already parsed from the upload layer. Each row names a team
//! by code and any day inside the month it covers; the importer normalizes
//! the period to the first of the month, drops rows for unknown team codes,
//! and replaces every touched period wholesale so a re-import of a corrected
//! sheet leaves no stale rows behind.

use chrono::{Datelike, NaiveDate};
use diesel::{Connection, PgConnection};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::db::models::overtime::{
    NewOvertimeMeasurement, OvertimeImportRow, OvertimeImportSummary,
};
use crate::db::repositories::overtime::OvertimeRepo;
use crate::db::repositories::teams::TeamsRepo;
use crate::error::AppResult;

pub struct OvertimeImporter {
    rows: Vec<OvertimeImportRow>,
}

struct ImportPlan {
    measurements: Vec<NewOvertimeMeasurement>,
    periods: Vec<NaiveDate>,
    skipped: usize,
}

fn normalize_period(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

fn build_plan(
    rows: &[OvertimeImportRow],
    mut resolve_team: impl FnMut(&str) -> AppResult<Option<i32>>,
) -> AppResult<ImportPlan> {
    let mut team_cache: BTreeMap<String, Option<i32>> = BTreeMap::new();
    let mut measurements = Vec::with_capacity(rows.len());
    let mut periods: Vec<NaiveDate> = Vec::new();
    let mut skipped = 0;

    for row in rows {
        let team_id = match team_cache.get(&row.team_code) {
            Some(cached) => *cached,
            None => {
                let resolved = resolve_team(&row.team_code)?;
                team_cache.insert(row.team_code.clone(), resolved);
                resolved
            }
        };

        let team_id = match team_id {
            Some(id) => id,
            None => {
                tracing::warn!(team_code = %row.team_code, "unknown team code, row skipped");
                skipped += 1;
                continue;
            }
        };

        let period = normalize_period(row.period);
        if !periods.contains(&period) {
            periods.push(period);
        }

        measurements.push(NewOvertimeMeasurement {
            measurement_id: Uuid::new_v4(),
            measurement_date: period,
            team_id,
            workdays_fix: row.workdays_fix,
            workdays_actual: row.workdays_actual,
            overtime_minutes: row.overtime_minutes,
        });
    }

    periods.sort_unstable();
    Ok(ImportPlan {
        measurements,
        periods,
        skipped,
    })
}

impl OvertimeImporter {
    pub fn new(rows: Vec<OvertimeImportRow>) -> Self {
        Self { rows }
    }

    /// Plans and commits the import. The delete of the touched periods and
    /// the insert of their replacement rows share one transaction.
    pub fn run(&self, conn: &mut PgConnection) -> AppResult<OvertimeImportSummary> {
        let plan = build_plan(&self.rows, |code| {
            Ok(TeamsRepo::find_by_code(conn, code)?.map(|team| team.team_id))
        })?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            OvertimeRepo::delete_periods(conn, &plan.periods)?;
            OvertimeRepo::insert_batch(conn, &plan.measurements)?;
            Ok(())
        })?;

        tracing::info!(
            inserted = plan.measurements.len(),
            skipped = plan.skipped,
            periods = plan.periods.len(),
            "overtime import committed"
        );

        Ok(OvertimeImportSummary {
            inserted: plan.measurements.len(),
            skipped: plan.skipped,
            periods_replaced: plan.periods,
        })
    }
}
