pub mod backup;
pub mod core;
pub mod import;
pub mod projects;
pub mod reviews;
pub mod schedule;
