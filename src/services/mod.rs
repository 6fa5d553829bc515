pub mod jira;
pub mod overtime_import;
pub mod permissions;
pub mod status_categories;
