pub mod app_entry;
pub mod batch;
pub mod hook;
pub mod snapshot;
