//! Core data models for the file vault.
//!
//! These entities represent uploaded files and the users that own them.
//! They map cleanly to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod file_record;
pub mod owner;
pub mod user;
