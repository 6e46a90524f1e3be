//! Database access layer
//!
//! SQLite-backed persistence for mixes and player settings, all through
//! one namespaced key-value table.

pub mod init;
pub mod mixes;
pub mod storage;
