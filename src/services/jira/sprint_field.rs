//! Parsing of the tracker's custom sprint field.
//!
//! The search API is asked for `versionedRepresentations`, which carries the
//! sprint field twice: representation "1" is the legacy greenhopper
//! `toString` dump (`com.atlassian.greenhopper...Sprint@1a2b[id=5,...]`) and
//! representation "2" is a structured object. Both lists describe the same
//! sprints in the same order. The structured form is preferred field by
//! field; dates in particular are sometimes present only in the legacy dump
//! on older server installations, so each field falls back independently.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::db::enums::SprintState;

const LEGACY_PREFIX: &str = "com.atlassian.greenhopper.service.sprint.Sprint";

/// One sprint as reported on an issue, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SprintRef {
    pub id: i32,
    pub name: String,
    pub state: Option<SprintState>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub complete_date: Option<DateTime<Utc>>,
}

impl SprintRef {
    /// The point the sprint actually finished, or is scheduled to.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.complete_date.or(self.end_date)
    }
}

/// Parses the raw `{"1": [...], "2": [...]}` value of the sprint field into
/// sprint refs, merging the two representations pairwise. Entries that yield
/// neither an id nor a name are dropped.
pub fn parse_sprint_field(value: &Value) -> Vec<SprintRef> {
    let legacy = value.get("1").and_then(Value::as_array);
    let structured = value.get("2").and_then(Value::as_array);

    let len = legacy
        .map(|l| l.len())
        .unwrap_or(0)
        .max(structured.map(|s| s.len()).unwrap_or(0));

    let mut sprints = Vec::with_capacity(len);
    for i in 0..len {
        let raw = legacy.and_then(|l| l.get(i)).and_then(Value::as_str);
        let obj = structured.and_then(|s| s.get(i));
        if let Some(sprint) = merge_representations(obj, raw) {
            sprints.push(sprint);
        }
    }
    sprints
}

/// The sprint an issue counted toward at instant `at`.
///
/// A future sprint wins outright: the issue is parked there and no
/// started-sprint window can also apply. Otherwise the first sprint whose
/// `[start, end]` window contains `at` is taken, where a recorded completion
/// overrides the planned end.
pub fn relevant_sprint_at(sprints: &[SprintRef], at: DateTime<Utc>) -> Option<&SprintRef> {
    for sprint in sprints {
        if sprint.state == Some(SprintState::Future) {
            return Some(sprint);
        }
        if let (Some(start), Some(end)) = (sprint.start_date, sprint.effective_end()) {
            if start <= at && at <= end {
                return Some(sprint);
            }
        }
    }
    None
}

fn merge_representations(structured: Option<&Value>, legacy: Option<&str>) -> Option<SprintRef> {
    let fields = legacy.and_then(parse_legacy).unwrap_or_default();

    let id = structured
        .and_then(|s| s.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id as i32)
        .or_else(|| fields.get("id").and_then(|v| v.parse().ok()))?;

    let name = structured
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| fields.get("name").cloned())?;

    let state = structured
        .and_then(|s| s.get("state"))
        .and_then(Value::as_str)
        .and_then(SprintState::parse)
        .or_else(|| fields.get("state").and_then(|v| SprintState::parse(v)));

    let date = |key: &str, legacy_key: &str| {
        structured
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .and_then(parse_date)
            .or_else(|| fields.get(legacy_key).and_then(|v| parse_date(v)))
    };

    Some(SprintRef {
        id,
        name,
        state,
        start_date: date("startDate", "startDate"),
        end_date: date("endDate", "endDate"),
        complete_date: date("completeDate", "completeDate"),
    })
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses the legacy `Sprint@...[key=value,key=value,...]` dump.
///
/// Values may themselves contain commas (sprint names regularly do), so the
/// body is split only at commas followed by an `identifier=` run. The
/// literal `<null>` marks an absent value.
fn parse_legacy(raw: &str) -> Option<BTreeMap<String, String>> {
    if !raw.starts_with(LEGACY_PREFIX) {
        return None;
    }
    let open = raw.find('[')?;
    let close = raw.rfind(']')?;
    if close <= open {
        return None;
    }
    let body = &raw[open + 1..close];

    let mut boundaries = vec![0usize];
    for (i, b) in body.bytes().enumerate() {
        if b == b',' && starts_new_pair(&body[i + 1..]) {
            boundaries.push(i + 1);
        }
    }
    boundaries.push(body.len() + 1);

    let mut fields = BTreeMap::new();
    for pair in boundaries.windows(2) {
        let segment = &body[pair[0]..pair[1] - 1];
        if let Some((key, value)) = segment.split_once('=') {
            if value != "<null>" {
                fields.insert(key.to_string(), value.to_string());
            }
        }
    }
    Some(fields)
}

fn starts_new_pair(rest: &str) -> bool {
    match rest.find('=') {
        Some(eq) => {
            let ident = &rest[..eq];
            !ident.is_empty()
                && ident
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}
