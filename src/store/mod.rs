//! Reference catalog host backed by SQLite.

pub mod schema;
pub mod sqlite;
