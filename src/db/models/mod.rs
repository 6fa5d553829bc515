pub mod activity;
pub mod api;
pub mod overtime;
pub mod snapshot;
pub mod sprint;
pub mod status_mapping;
pub mod team;
pub mod user;

pub use activity::*;
pub use api::*;
pub use overtime::*;
pub use snapshot::*;
pub use sprint::*;
pub use status_mapping::*;
pub use team::*;
pub use user::*;
