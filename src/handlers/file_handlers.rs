//! HTTP handlers for upload, listing, serving, preview, and deletion.
//!
//! Handlers translate requests into [`FileService`] calls and shape the
//! responses; owner identity is resolved once per request into an
//! [`OwnerResolution`] before any work happens.

use std::collections::BTreeMap;

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{
        file_record::{Category, FileRecord},
        owner::OwnerResolution,
        user::User,
    },
    services::{
        disk_store::DiskStore,
        file_service::{FileService, IngestRequest, Preview},
        format,
    },
};

/// Optional owner hints accepted on the upload query string.
#[derive(Debug, Deserialize, Default)]
pub struct UploadQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub email: Option<String>,
}

/// `email` accepted in either the query string or a JSON body.
#[derive(Debug, Deserialize, Default)]
pub struct EmailParams {
    pub email: Option<String>,
}

/// A file record enriched with formatted display fields.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub file_type: String,
    pub category: Category,
    pub size: i64,
    pub size_formatted: String,
    pub upload_date: DateTime<Utc>,
    pub upload_date_formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count_formatted: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
    pub email: String,
}

impl From<&FileRecord> for FileView {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            url: record.url.clone(),
            file_type: record.file_type.clone(),
            category: record.category,
            size: record.size,
            size_formatted: format::human_size(record.size),
            upload_date: record.created_at,
            upload_date_formatted: format::display_date(&record.created_at),
            duration: record.duration,
            duration_formatted: record.duration.map(format::clock_duration),
            character_count: record.character_count,
            character_count_formatted: record.character_count.map(format::grouped_count),
            tags: record.tags.0.clone(),
            description: record.description.clone(),
            email: record.email.clone(),
        }
    }
}

/// The freshly ingested record echoed back with convenience fields.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileView {
    pub id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub url: String,
    pub file_type: String,
    pub category: Category,
    pub size: i64,
    pub size_formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count_formatted: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
    pub email: String,
    pub upload_time: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file: UploadedFileView,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    pub total_files: usize,
    pub total_size: i64,
    pub total_size_formatted: String,
    pub categories: BTreeMap<&'static str, i64>,
    pub latest_upload: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
    pub user_email: String,
    pub files: Vec<FileView>,
    pub summary: ListSummary,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub total_files: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserFilesResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
    pub user_id: Uuid,
    pub user_email: String,
    pub owner: OwnerProfile,
    pub files: Vec<FileView>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    pub deleted_file: DeletedFile,
}

/// Verified identity from the upstream authentication layer, if any.
fn verified_identity(headers: &HeaderMap) -> (Option<Uuid>, Option<String>) {
    let id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok());
    let email = headers
        .get("x-user-email")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    (id, email)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// `POST /files/upload` — multipart ingestion.
pub async fn upload_file(
    State(service): State<FileService>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut payload: Option<(String, Option<String>, Bytes)> = None;
    let mut email_field: Option<String> = None;
    let mut user_id_field: Option<String> = None;
    let mut tags_field: Option<String> = None;
    let mut description_field: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        tracing::warn!("unreadable multipart field: {}", err);
        AppError::bad_request("invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field.bytes().await.map_err(|err| {
                    tracing::warn!("failed to read upload payload: {}", err);
                    AppError::bad_request("failed to read uploaded file")
                })?;
                payload = Some((original_name, content_type, bytes));
            }
            "email" => email_field = field.text().await.ok(),
            "userId" => user_id_field = field.text().await.ok(),
            "tags" => tags_field = field.text().await.ok(),
            "description" => description_field = field.text().await.ok(),
            _ => {}
        }
    }

    let (original_name, content_type, bytes) =
        payload.ok_or_else(|| AppError::bad_request("no file uploaded"))?;

    let (verified_id, verified_email) = verified_identity(&headers);
    let declared_id = non_empty(user_id_field)
        .or(non_empty(query.user_id))
        .and_then(|s| Uuid::parse_str(&s).ok());
    let declared_email = non_empty(email_field).or(non_empty(query.email));
    let owner = OwnerResolution::rank(verified_id, verified_email, declared_id, declared_email);

    let tags = tags_field
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let record = service
        .ingest(
            IngestRequest {
                original_name,
                content_type,
                bytes,
                tags,
                description: non_empty(description_field),
            },
            owner,
        )
        .await?;

    let file = UploadedFileView {
        id: record.id,
        original_name: record.name.clone(),
        stored_name: record.stored_name.clone(),
        url: record.url.clone(),
        file_type: record.file_type.clone(),
        category: record.category,
        size: record.size,
        size_formatted: format::human_size(record.size),
        duration: record.duration,
        duration_formatted: record.duration.map(format::clock_duration),
        character_count: record.character_count,
        character_count_formatted: record.character_count.map(format::grouped_count),
        tags: record.tags.0.clone(),
        description: record.description.clone(),
        email: record.email.clone(),
        upload_time: record.created_at,
    };

    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded successfully and metadata stored".into(),
        file,
    }))
}

/// Owner email for list-style endpoints: verified identity first, then the
/// JSON body, then the query string. Empty strings count as absent.
fn list_email(
    headers: &HeaderMap,
    body: Option<EmailParams>,
    query: EmailParams,
) -> Option<String> {
    let (_, verified_email) = verified_identity(headers);
    verified_email
        .or(non_empty(body.and_then(|b| b.email)))
        .or(non_empty(query.email))
}

/// `GET|POST /files/allfiles` — filtered, sorted, enriched listing.
pub async fn list_files(
    State(service): State<FileService>,
    Query(query): Query<EmailParams>,
    headers: HeaderMap,
    body: Option<Json<EmailParams>>,
) -> Result<Json<ListResponse>, AppError> {
    let email = list_email(&headers, body.map(|Json(b)| b), query);

    let records = service.list(email.as_deref()).await?;
    let files: Vec<FileView> = records.iter().map(FileView::from).collect();

    let total_size: i64 = records.iter().map(|r| r.size).sum();
    let mut categories: BTreeMap<&'static str, i64> = BTreeMap::new();
    for record in &records {
        *categories.entry(record.category.as_str()).or_insert(0) += 1;
    }

    let summary = ListSummary {
        total_files: files.len(),
        total_size,
        total_size_formatted: format::human_size(total_size),
        categories,
        latest_upload: files.first().map(|f| f.upload_date_formatted.clone()),
    };

    Ok(Json(ListResponse {
        success: true,
        message: format!("Retrieved {} files successfully", files.len()),
        count: files.len(),
        user_email: email.unwrap_or_else(|| "all users".into()),
        files,
        summary,
    }))
}

/// `GET|POST /files/user-files` — owner profile plus the linked file
/// sequence from the owner's side of the relation.
pub async fn user_files(
    State(service): State<FileService>,
    Query(query): Query<EmailParams>,
    headers: HeaderMap,
    body: Option<Json<EmailParams>>,
) -> Result<Json<UserFilesResponse>, AppError> {
    let email = list_email(&headers, body.map(|Json(b)| b), query)
        .ok_or_else(|| AppError::bad_request("user email is required"))?;

    let (user, records) = service.user_files(&email).await?;
    let files: Vec<FileView> = records.iter().map(FileView::from).collect();

    Ok(Json(UserFilesResponse {
        success: true,
        message: format!("Retrieved {} files from user profile", files.len()),
        count: files.len(),
        user_id: user.id,
        user_email: user.email.clone(),
        owner: owner_profile(&user, files.len()),
        files,
    }))
}

fn owner_profile(user: &User, total_files: usize) -> OwnerProfile {
    OwnerProfile {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        total_files,
    }
}

/// `DELETE /files/delete/{file_id}`.
pub async fn delete_file(
    State(service): State<FileService>,
    Path(file_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let record = service.delete(&file_id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "File deleted successfully".into(),
        deleted_file: DeletedFile {
            id: record.id,
            name: record.name,
            email: record.email,
        },
    }))
}

/// `GET /files/serve/{file_name}` — raw byte stream with content type and
/// caching headers.
pub async fn serve_file(
    State(service): State<FileService>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = service.store.open_for_read(&file_name).await?;
    let content_type = mime_guess::from_path(&file_name)
        .first_or_octet_stream()
        .to_string();

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );
    Ok(response)
}

/// `GET /files/download/{file_name}` — forced download under the
/// reconstructed original name.
pub async fn download_file(
    State(service): State<FileService>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = service.store.open_for_read(&file_name).await?;
    let display_name = format::display_name(&file_name);
    let disposition = format::content_disposition(&display_name);

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

/// `GET /files/content/{file_name}` — inline text preview, or a structured
/// notice pointing binary files at the raw serve route.
pub async fn file_content(
    State(service): State<FileService>,
    Path(file_name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let body = match service.preview(&file_name).await? {
        Preview::Text {
            content,
            stats,
            size,
            modified,
        } => json!({
            "success": true,
            "fileName": file_name,
            "fileType": "text",
            "content": content,
            "stats": {
                "characterCount": stats.character_count,
                "wordCount": stats.word_count,
                "lineCount": stats.line_count,
                "fileSize": size,
                "lastModified": modified.to_rfc3339(),
            }
        }),
        Preview::Binary {
            size,
            modified,
            extension,
        } => json!({
            "success": true,
            "fileName": file_name,
            "fileType": "binary",
            "message": "Binary file - use the serve endpoint for direct access",
            "serveUrl": DiskStore::url_for(&file_name),
            "stats": {
                "fileSize": size,
                "lastModified": modified.to_rfc3339(),
                "extension": extension,
            }
        }),
    };
    Ok(Json(body))
}
