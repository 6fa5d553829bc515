use chrono::NaiveDate;
use serde_json::json;

use teampulse_backend::db::enums::{SprintState, StatusCategory, TeamRole};
use teampulse_backend::db::models::overtime::OvertimeImportRow;
use teampulse_backend::db::models::status_mapping::UpsertStatusMappingRequest;

#[test]
fn overtime_rows_deserialize_from_the_import_payload() {
    let payload = json!([
        {
            "period": "2024-03-17",
            "team_code": "alpha",
            "workdays_fix": 20,
            "workdays_actual": 21,
            "overtime_minutes": 135
        },
        {
            "period": "2024-04-01",
            "team_code": "beta",
            "workdays_fix": null,
            "workdays_actual": 19,
            "overtime_minutes": 0
        }
    ]);

    let rows: Vec<OvertimeImportRow> = serde_json::from_value(payload).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].period, NaiveDate::from_ymd_opt(2024, 3, 17).unwrap());
    assert_eq!(rows[0].workdays_fix, Some(20));
    assert_eq!(rows[1].workdays_fix, None);
}

#[test]
fn status_mapping_requests_use_snake_case_categories() {
    let request: UpsertStatusMappingRequest = serde_json::from_value(json!({
        "activity_id": 3,
        "status": "In Review",
        "status_category": "in_progress"
    }))
    .unwrap();
    assert_eq!(request.activity_id, Some(3));
    assert_eq!(request.status_category, StatusCategory::InProgress);

    let global: UpsertStatusMappingRequest = serde_json::from_value(json!({
        "activity_id": null,
        "status": "Done",
        "status_category": "done"
    }))
    .unwrap();
    assert_eq!(global.activity_id, None);
}

#[test]
fn role_text_round_trips_and_unknown_text_is_rejected() {
    assert_eq!(TeamRole::parse("team_admin").unwrap(), TeamRole::TeamAdmin);
    assert_eq!(TeamRole::parse("member").unwrap().as_str(), "member");
    assert!(TeamRole::parse("owner").is_err());
    assert!(TeamRole::parse("TEAM_ADMIN").is_err());
}

#[test]
fn sprint_state_parsing_accepts_both_tracker_casings() {
    assert_eq!(SprintState::parse("ACTIVE"), Some(SprintState::Active));
    assert_eq!(SprintState::parse("active"), Some(SprintState::Active));
    assert_eq!(SprintState::parse("Closed"), Some(SprintState::Closed));
    assert_eq!(SprintState::parse("FUTURE"), Some(SprintState::Future));
    assert_eq!(SprintState::parse("archived"), None);
}
