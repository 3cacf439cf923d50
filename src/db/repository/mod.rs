//! Repository layer: entity-scoped database operations.
//!
//! All public functions are re-exported here so callers can use
//! `db::repository::insert_message` without knowing the sub-module.

mod conversation;
mod knowledge;
mod medication;

pub use conversation::*;
pub use knowledge::*;
pub use medication::*;

/// Timestamp layout stored in every TEXT datetime column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
