use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

use teampulse_backend::config::Config;
use teampulse_backend::error::{AppError, AppResult};
use teampulse_backend::services::jira::client::{
    TrackerClient, TrackerFieldDef, TrackerIssue, TrackerStatus,
};
use teampulse_backend::services::jira::sync::{JiraSync, snapshot_times};

fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        database_max_connections: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 8000,
        log_level: "info".to_string(),
        log_format: "plain".to_string(),
        jira_server: "https://tracker.example.com".to_string(),
        jira_user_email: "bot@example.com".to_string(),
        jira_api_token: "token".to_string(),
        jira_field_sprint: "Sprint".to_string(),
        jira_field_storypoints: "Story Points".to_string(),
        sync_interval_secs: 3600,
    }
}

struct FieldsOnlyTracker {
    fields: Vec<(&'static str, &'static str)>,
}

#[async_trait]
impl TrackerClient for FieldsOnlyTracker {
    async fn statuses(&self) -> AppResult<Vec<TrackerStatus>> {
        Ok(vec![TrackerStatus {
            name: "To Do".to_string(),
            category_key: "new".to_string(),
        }])
    }

    async fn fields(&self) -> AppResult<Vec<TrackerFieldDef>> {
        Ok(self
            .fields
            .iter()
            .map(|(id, name)| TrackerFieldDef {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect())
    }

    async fn search_issues(&self, _jql: &str, _fields: &[String]) -> AppResult<Vec<TrackerIssue>> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn session_opens_when_configured_fields_exist() {
    let tracker = Arc::new(FieldsOnlyTracker {
        fields: vec![
            ("customfield_10020", "Sprint"),
            ("customfield_10026", "Story Points"),
            ("status", "Status"),
        ],
    });
    assert!(JiraSync::connect(tracker, &test_config()).await.is_ok());
}

#[tokio::test]
async fn missing_field_name_is_a_config_error_listing_alternatives() {
    let tracker = Arc::new(FieldsOnlyTracker {
        fields: vec![("customfield_10020", "Sprint"), ("status", "Status")],
    });
    let err = match JiraSync::connect(tracker, &test_config()).await {
        Ok(_) => panic!("expected a config error"),
        Err(err) => err,
    };
    match err {
        AppError::Config(message) => {
            assert!(message.contains("Story Points"));
            // The operator gets the tracker's actual field names.
            assert!(message.contains("Sprint"));
            assert!(message.contains("Status"));
        }
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn running_backfill_samples_one_instant_per_spanned_day() {
    let start = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
    // The window is capped by the current time, so the last sample is now.
    let now = Utc.with_ymd_and_hms(2024, 4, 14, 17, 30, 0).unwrap();
    let times = snapshot_times(start, now, now);

    // Thirteen full day-end samples plus the current instant.
    assert_eq!(times.len(), 14);
    assert_eq!(
        times[0],
        Utc.with_ymd_and_hms(2024, 4, 1, 23, 59, 59).unwrap()
    );
    assert_eq!(*times.last().unwrap(), now);
    assert!(times.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn completed_backfill_keeps_day_end_samples_after_completion() {
    let start = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 4, 14, 17, 30, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let times = snapshot_times(start, end, now);

    assert_eq!(times.len(), 14);
    // A sprint completed mid-day still gets its last day sampled at day end.
    assert_eq!(
        *times.last().unwrap(),
        Utc.with_ymd_and_hms(2024, 4, 14, 23, 59, 59).unwrap()
    );
}
