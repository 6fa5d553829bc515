mod models;
mod permissions;
mod sync;
