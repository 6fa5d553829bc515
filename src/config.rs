use crate::error::{AppError, AppResult};
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,

    pub jira_server: String,
    pub jira_user_email: String,
    pub jira_api_token: String,
    // Tracker field names are installation-specific and resolved to field
    // IDs once per sync session.
    #[serde(default = "default_jira_field_sprint")]
    pub jira_field_sprint: String,
    #[serde(default = "default_jira_field_storypoints")]
    pub jira_field_storypoints: String,

    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
}

fn default_max_connections() -> u32 {
    20
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_jira_field_sprint() -> String {
    "Sprint".to_string()
}
fn default_jira_field_storypoints() -> String {
    "Story Points".to_string()
}
fn default_sync_interval() -> u64 {
    3600
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()
            .map_err(|e| AppError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be > 0".to_string(),
            ));
        }

        if self.jira_server.trim().is_empty() {
            return Err(AppError::Config("JIRA_SERVER must be set".to_string()));
        }

        if self.jira_user_email.trim().is_empty() || self.jira_api_token.trim().is_empty() {
            return Err(AppError::Config(
                "JIRA_USER_EMAIL and JIRA_API_TOKEN must both be set".to_string(),
            ));
        }

        if self.jira_field_sprint.trim().is_empty()
            || self.jira_field_storypoints.trim().is_empty()
        {
            return Err(AppError::Config(
                "JIRA_FIELD_SPRINT and JIRA_FIELD_STORYPOINTS must not be empty".to_string(),
            ));
        }

        if self.sync_interval_secs == 0 {
            return Err(AppError::Config(
                "SYNC_INTERVAL_SECS must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
