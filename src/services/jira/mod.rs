pub mod client;
pub mod sprint_field;
pub mod sync;
