pub mod activities;
pub mod overtime;
pub mod snapshots;
pub mod sprints;
pub mod status_mappings;
pub mod teams;
pub mod users;
