//! SQLite storage for the lending state engine.
//!
//! - Database initialization, pragmas and schema migration
//! - `Repository` for read queries and `StoreTx` for per-event writes

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{Repository, StoreTx};
