//! Defines routes for the file-management API.
//!
//! ## Structure
//! - **Ingestion**
//!   - `POST   /files/upload` — multipart upload with optional owner fields
//! - **Retrieval**
//!   - `GET|POST /files/allfiles` — filtered, sorted, enriched listing
//!   - `GET|POST /files/user-files` — owner profile + linked file sequence
//! - **Serving**
//!   - `GET    /files/serve/{file_name}` — raw byte stream
//!   - `GET    /files/content/{file_name}` — text preview or binary notice
//!   - `GET    /files/download/{file_name}` — forced download
//! - **Deletion**
//!   - `DELETE /files/delete/{file_id}`
//!
//! Health endpoints are mounted at the root.

use crate::{
    handlers::{
        file_handlers::{
            delete_file, download_file, file_content, list_files, serve_file, upload_file,
            user_files,
        },
        health_handlers::{healthz, readyz},
    },
    services::file_service::FileService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Build the router for all file routes.
///
/// The router carries shared state (`FileService`) to all handlers;
/// `max_upload_bytes` caps request bodies at the configured ceiling.
pub fn routes(max_upload_bytes: usize) -> Router<FileService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // ingestion + retrieval
        .route("/files/upload", post(upload_file))
        .route("/files/allfiles", get(list_files).post(list_files))
        .route("/files/user-files", get(user_files).post(user_files))
        .route("/files/delete/{file_id}", delete(delete_file))
        // serving
        .route("/files/serve/{file_name}", get(serve_file))
        .route("/files/content/{file_name}", get(file_content))
        .route("/files/download/{file_name}", get(download_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
