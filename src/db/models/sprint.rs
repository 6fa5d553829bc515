use crate::db::enums::SprintState;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = crate::schema::sprints)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Sprint {
    pub sprint_id: i32,
    pub activity_id: i32,
    pub jira_sprint_id: Option<i32>,
    pub name: String,
    pub state: SprintState,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub complete_date: Option<DateTime<Utc>>,
    // Tracks issue-data freshness only; metadata-only refreshes never touch it.
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = crate::schema::sprints)]
pub struct NewSprint {
    pub activity_id: i32,
    pub jira_sprint_id: Option<i32>,
    pub name: String,
    pub state: SprintState,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub complete_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl NewSprint {
    /// Copy carrying `at` as the issue-data freshness stamp.
    pub fn stamped(&self, at: DateTime<Utc>) -> NewSprint {
        NewSprint {
            last_updated: Some(at),
            ..self.clone()
        }
    }
}

impl Sprint {
    pub fn is_future(&self) -> bool {
        self.state == SprintState::Future
    }

    pub fn is_active(&self) -> bool {
        self.state == SprintState::Active
    }

    pub fn is_closed(&self) -> bool {
        self.state == SprintState::Closed
    }

    /// The point the sprint actually finished, or is scheduled to.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.complete_date.or(self.end_date)
    }

    /// Staleness policy driving dashboard-triggered re-syncs.
    ///
    /// Future sprints are never due. A never-synced sprint is always due.
    /// An active sprint is due after 15 minutes; a closed sprint is due only
    /// if its last sync happened before the sprint itself ended (late data
    /// may still arrive).
    pub fn should_be_updated(&self, now: DateTime<Utc>) -> bool {
        if self.is_future() {
            return false;
        }

        let last_updated = match self.last_updated {
            Some(t) => t,
            None => return true,
        };

        if self.is_active() {
            now > last_updated && now - last_updated > Duration::minutes(15)
        } else {
            match self.effective_end() {
                Some(end) => last_updated < end,
                None => false,
            }
        }
    }
}

// API DTO
#[derive(Serialize)]
pub struct SprintInfo {
    pub sprint_id: i32,
    pub jira_sprint_id: Option<i32>,
    pub name: String,
    pub state: SprintState,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub complete_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub should_be_updated: bool,
}

impl SprintInfo {
    pub fn from_sprint(sprint: Sprint, now: DateTime<Utc>) -> Self {
        let should_be_updated = sprint.should_be_updated(now);
        Self {
            sprint_id: sprint.sprint_id,
            jira_sprint_id: sprint.jira_sprint_id,
            name: sprint.name,
            state: sprint.state,
            start_date: sprint.start_date,
            end_date: sprint.end_date,
            complete_date: sprint.complete_date,
            last_updated: sprint.last_updated,
            should_be_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sprint(state: SprintState) -> Sprint {
        Sprint {
            sprint_id: 1,
            activity_id: 1,
            jira_sprint_id: Some(7),
            name: "Sprint 7".to_string(),
            state,
            start_date: Some(Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2024, 4, 15, 8, 0, 0).unwrap()),
            complete_date: None,
            last_updated: None,
        }
    }

    #[test]
    fn never_synced_active_sprint_is_due() {
        let s = sprint(SprintState::Active);
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        assert!(s.should_be_updated(now));
    }

    #[test]
    fn active_sprint_synced_recently_is_not_due() {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        let mut s = sprint(SprintState::Active);
        s.last_updated = Some(now - Duration::minutes(10));
        assert!(!s.should_be_updated(now));
    }

    #[test]
    fn active_sprint_synced_twenty_minutes_ago_is_due() {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        let mut s = sprint(SprintState::Active);
        s.last_updated = Some(now - Duration::minutes(20));
        assert!(s.should_be_updated(now));
    }

    #[test]
    fn closed_sprint_synced_after_end_is_not_due() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut s = sprint(SprintState::Closed);
        s.last_updated = Some(s.end_date.unwrap() + Duration::hours(1));
        assert!(!s.should_be_updated(now));
    }

    #[test]
    fn closed_sprint_synced_before_end_is_due() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut s = sprint(SprintState::Closed);
        s.last_updated = Some(s.end_date.unwrap() - Duration::hours(1));
        assert!(s.should_be_updated(now));
    }

    #[test]
    fn complete_date_takes_precedence_over_end_date() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut s = sprint(SprintState::Closed);
        // Completed early; synced between complete_date and end_date.
        s.complete_date = Some(Utc.with_ymd_and_hms(2024, 4, 10, 8, 0, 0).unwrap());
        s.last_updated = Some(Utc.with_ymd_and_hms(2024, 4, 12, 8, 0, 0).unwrap());
        assert!(!s.should_be_updated(now));
    }

    #[test]
    fn stamping_sets_the_freshness_mark_and_nothing_else() {
        let new = NewSprint {
            activity_id: 1,
            jira_sprint_id: Some(7),
            name: "Sprint 7".to_string(),
            state: SprintState::Active,
            start_date: Some(Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()),
            end_date: None,
            complete_date: None,
            last_updated: None,
        };
        let at = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        let stamped = new.stamped(at);
        assert_eq!(stamped.last_updated, Some(at));
        assert_eq!(stamped.jira_sprint_id, new.jira_sprint_id);
        assert_eq!(stamped.name, new.name);
        assert_eq!(stamped.start_date, new.start_date);
    }

    #[test]
    fn future_sprint_is_never_due() {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        let mut s = sprint(SprintState::Future);
        assert!(!s.should_be_updated(now));
        s.last_updated = Some(now - Duration::days(30));
        assert!(!s.should_be_updated(now));
    }
}
