//! Thin HTTP client for the issue tracker's REST API.
//!
//! The trait is the seam the sync engine is written against; tests drive it
//! with an in-memory implementation instead of a live server.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{AppError, AppResult};

const SEARCH_PAGE_SIZE: u32 = 100;

/// A workflow status as defined on the tracker, with the tracker's own
/// coarse category key (`new`, `indeterminate`, `done`).
#[derive(Debug, Clone)]
pub struct TrackerStatus {
    pub name: String,
    pub category_key: String,
}

/// A field definition; custom fields get opaque ids like `customfield_10020`
/// and are addressed by display name in configuration.
#[derive(Debug, Clone)]
pub struct TrackerFieldDef {
    pub id: String,
    pub name: String,
}

/// One issue from a search, holding the versioned field representations the
/// sync engine reads sprint and story point data from.
#[derive(Debug, Clone)]
pub struct TrackerIssue {
    pub id: String,
    pub key: String,
    pub representations: Map<String, Value>,
    /// Set by historical (`status WAS ...`) searches: the status the issue
    /// held at the queried instant, which the field payload does not carry.
    pub status_override: Option<String>,
}

impl TrackerIssue {
    /// The raw value of one field, preferring the structured representation.
    pub fn field(&self, field_id: &str) -> Option<&Value> {
        self.representations.get(field_id)
    }

    /// The issue's status name: a historical override if one was recorded,
    /// otherwise the current status from the field payload.
    pub fn status_name(&self) -> Option<String> {
        if let Some(status) = &self.status_override {
            return Some(status.clone());
        }
        let status = self.representations.get("status")?;
        ["2", "1"]
            .iter()
            .find_map(|version| status.get(version))
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// The story point estimate, zero when the field is empty.
    pub fn story_points(&self, field_id: &str) -> f64 {
        self.representations
            .get(field_id)
            .and_then(|v| ["2", "1"].iter().find_map(|version| v.get(version)))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// All workflow statuses defined on the tracker.
    async fn statuses(&self) -> AppResult<Vec<TrackerStatus>>;

    /// All field definitions, used to resolve configured field names to ids.
    async fn fields(&self) -> AppResult<Vec<TrackerFieldDef>>;

    /// Runs a JQL search, following pagination to exhaustion.
    async fn search_issues(&self, jql: &str, fields: &[String]) -> AppResult<Vec<TrackerIssue>>;
}

pub struct JiraHttpClient {
    http: reqwest::Client,
    base_url: String,
    user_email: String,
    api_token: String,
}

#[derive(Deserialize)]
struct StatusPayload {
    name: String,
    #[serde(rename = "statusCategory")]
    status_category: StatusCategoryPayload,
}

#[derive(Deserialize)]
struct StatusCategoryPayload {
    key: String,
}

#[derive(Deserialize)]
struct FieldPayload {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct SearchPayload {
    issues: Vec<IssuePayload>,
    total: u32,
}

#[derive(Deserialize)]
struct IssuePayload {
    id: String,
    key: String,
    #[serde(rename = "versionedRepresentations", default)]
    versioned_representations: Map<String, Value>,
}

impl JiraHttpClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.jira_server.trim_end_matches('/').to_string(),
            user_email: config.jira_user_email.clone(),
            api_token: config.jira_api_token.clone(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.user_email, Some(&self.api_token))
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::tracker(format!("request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::tracker(format!(
                "{} returned {}",
                path, status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::tracker(format!("malformed response from {}: {}", path, e)))
    }
}

#[async_trait]
impl TrackerClient for JiraHttpClient {
    async fn statuses(&self) -> AppResult<Vec<TrackerStatus>> {
        let payload: Vec<StatusPayload> = self.get_json("/rest/api/2/status", &[]).await?;
        Ok(payload
            .into_iter()
            .map(|s| TrackerStatus {
                name: s.name,
                category_key: s.status_category.key,
            })
            .collect())
    }

    async fn fields(&self) -> AppResult<Vec<TrackerFieldDef>> {
        let payload: Vec<FieldPayload> = self.get_json("/rest/api/2/field", &[]).await?;
        Ok(payload
            .into_iter()
            .map(|f| TrackerFieldDef {
                id: f.id,
                name: f.name,
            })
            .collect())
    }

    async fn search_issues(&self, jql: &str, fields: &[String]) -> AppResult<Vec<TrackerIssue>> {
        let mut issues = Vec::new();
        let mut start_at: u32 = 0;

        loop {
            let page: SearchPayload = self
                .get_json(
                    "/rest/api/2/search",
                    &[
                        ("jql", jql.to_string()),
                        ("fields", fields.join(",")),
                        ("expand", "versionedRepresentations".to_string()),
                        ("startAt", start_at.to_string()),
                        ("maxResults", SEARCH_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;

            let fetched = page.issues.len() as u32;
            issues.extend(page.issues.into_iter().map(|issue| TrackerIssue {
                id: issue.id,
                key: issue.key,
                representations: issue.versioned_representations,
                status_override: None,
            }));

            start_at += fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }

        Ok(issues)
    }
}
