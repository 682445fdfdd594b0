//! filevault — a personal file-management web service.
//!
//! Users upload media and document files, browse and filter them, preview
//! them by type, and download or delete them. The ingestion pipeline
//! classifies each upload, derives type-specific metadata (text
//! statistics, estimated media duration), stores the bytes under a
//! collision-resistant name, and links the record to its owner.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
