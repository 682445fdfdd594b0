//! FileService — ingestion, retrieval, and deletion of user files, backed
//! by SQLite for records and [`DiskStore`] for payload bytes.
//!
//! Ingestion is one logical unit of work with partial-failure tolerance:
//! byte storage and record persistence are fatal failure points, metadata
//! extraction and owner linkage degrade softly. No compensating delete is
//! attempted for stored bytes when record persistence fails; such orphans
//! are a known inconsistency left to an external cleanup job.

use std::{io, sync::Arc, sync::LazyLock};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use regex::Regex;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{file_record::FileRecord, owner::OwnerResolution, user::User};

use super::{
    classifier,
    disk_store::DiskStore,
    metadata::{self, TextStats},
    notify::{FileUploaded, Notifier},
};

/// Recorded as the owner address when the owner resolved by id only.
pub const UNKNOWN_OWNER_EMAIL: &str = "unknown@example.com";

/// Extensions previewable inline as text.
const PREVIEW_TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".json", ".xml", ".csv", ".js", ".ts", ".html", ".css", ".log",
];

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

/// Syntactic email check applied before any store query.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Error)]
pub enum FileError {
    /// User-correctable input problem (missing file, malformed email,
    /// invalid id format).
    #[error("{0}")]
    InvalidInput(String),
    /// Missing record or missing stored bytes.
    #[error("{0}")]
    NotFound(String),
    /// Byte storage failed; the operation was aborted.
    #[error("storage unavailable: {0}")]
    Storage(#[from] io::Error),
    /// The record store failed; the operation was aborted.
    #[error("record store failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

pub type FileResult<T> = Result<T, FileError>;

/// Everything the orchestrator needs from one upload request.
#[derive(Debug)]
pub struct IngestRequest {
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    pub tags: Vec<String>,
    pub description: Option<String>,
}

/// Inline preview of a stored object.
#[derive(Debug)]
pub enum Preview {
    Text {
        content: String,
        stats: TextStats,
        size: i64,
        modified: DateTime<Utc>,
    },
    /// Not previewable inline; callers are pointed at the raw serve route.
    Binary {
        size: i64,
        modified: DateTime<Utc>,
        extension: String,
    },
}

const FILE_COLUMNS: &str = "id, name, stored_name, url, file_type, size, category, duration, \
     character_count, tags, description, email, uploaded_by, created_at, updated_at";

#[derive(Clone)]
pub struct FileService {
    /// Shared SQLite pool holding file and user records.
    pub db: Arc<SqlitePool>,

    /// Physical payload storage.
    pub store: DiskStore,

    /// Post-persist notification channel.
    pub notifier: Notifier,
}

impl FileService {
    pub fn new(db: Arc<SqlitePool>, store: DiskStore, notifier: Notifier) -> Self {
        Self {
            db,
            store,
            notifier,
        }
    }

    /// Ingest one uploaded file: store bytes, classify, derive metadata,
    /// persist the record, then best-effort link it to the owner and emit
    /// a notification event.
    pub async fn ingest(
        &self,
        req: IngestRequest,
        owner: OwnerResolution,
    ) -> FileResult<FileRecord> {
        if owner.is_unresolved() {
            return Err(FileError::InvalidInput(
                "no owner identity supplied with upload".into(),
            ));
        }

        let mime = req
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".into());

        // Fatal on failure: no record exists yet, nothing to clean up.
        let stored_name = self.store.store(&req.bytes, &req.original_name).await?;
        let url = DiskStore::url_for(&stored_name);

        let category = classifier::classify(&mime, &req.original_name);
        let derived = metadata::extract(
            category,
            &self.store.path_for(&stored_name),
            req.bytes.len() as i64,
            &mime,
        )
        .await;

        let email = owner
            .email
            .clone()
            .unwrap_or_else(|| UNKNOWN_OWNER_EMAIL.into());
        let description = req
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("{} file uploaded - {}", category.as_str(), req.original_name));
        let now = Utc::now();

        // Fatal on failure: the stored bytes stay behind as a known orphan.
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "INSERT INTO files ({FILE_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {FILE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&req.original_name)
        .bind(&stored_name)
        .bind(&url)
        .bind(&mime)
        .bind(req.bytes.len() as i64)
        .bind(category)
        .bind(derived.duration)
        .bind(derived.character_count)
        .bind(sqlx::types::Json(req.tags))
        .bind(&description)
        .bind(&email)
        .bind(owner.user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;

        self.link_owner(&record, &owner).await;

        self.notifier.file_uploaded(FileUploaded {
            email: record.email.clone(),
            name: record.name.clone(),
            url: record.url.clone(),
        });

        Ok(record)
    }

    /// Append the record id to the owner's file sequence, trying the
    /// resolved user id first and falling back to the declared email.
    /// Failures are logged and swallowed; the record itself is already
    /// safely persisted and queries by owner email remain authoritative.
    async fn link_owner(&self, record: &FileRecord, owner: &OwnerResolution) {
        if let Some(user_id) = owner.user_id {
            match self.append_user_file(user_id, record.id).await {
                Ok(true) => return,
                Ok(false) => warn!(%user_id, "no such user for file linkage"),
                Err(err) => warn!(%user_id, "file linkage by id failed: {}", err),
            }
        }

        let Some(email) = owner.email.as_deref() else {
            warn!(file = %record.id, "no usable owner reference for file linkage");
            return;
        };
        match self.user_id_by_email(email).await {
            Ok(Some(user_id)) => match self.append_user_file(user_id, record.id).await {
                Ok(true) => debug!(%user_id, file = %record.id, "linked file by owner email"),
                Ok(false) => warn!(%user_id, "user vanished during file linkage"),
                Err(err) => warn!("file linkage by email failed: {}", err),
            },
            Ok(None) => warn!(email, "no user found by email for file linkage"),
            Err(err) => warn!("owner lookup by email failed: {}", err),
        }
    }

    async fn user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&*self.db)
            .await
    }

    /// Returns `Ok(false)` when the user does not exist.
    async fn append_user_file(&self, user_id: Uuid, file_id: Uuid) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&*self.db)
            .await?;
        if exists == 0 {
            return Ok(false);
        }

        let position = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM user_files WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&*self.db)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO user_files (user_id, file_id, position) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(file_id)
        .bind(position)
        .execute(&*self.db)
        .await?;
        Ok(true)
    }

    /// List file records, optionally filtered to one owner email,
    /// newest first.
    ///
    /// A malformed email is rejected before any query; no email at all
    /// intentionally returns every record.
    pub async fn list(&self, owner_email: Option<&str>) -> FileResult<Vec<FileRecord>> {
        let records = match owner_email {
            Some(email) => {
                if !is_valid_email(email) {
                    return Err(FileError::InvalidInput("invalid email format".into()));
                }
                sqlx::query_as::<_, FileRecord>(&format!(
                    "SELECT {FILE_COLUMNS} FROM files WHERE email = ? ORDER BY created_at DESC"
                ))
                .bind(email)
                .fetch_all(&*self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, FileRecord>(&format!(
                    "SELECT {FILE_COLUMNS} FROM files ORDER BY created_at DESC"
                ))
                .fetch_all(&*self.db)
                .await?
            }
        };
        Ok(records)
    }

    /// Resolve an owner by email and read their linked file sequence.
    ///
    /// Diverges from [`FileService::list`] in source of truth: this reads
    /// the `user_files` link table, which is a best-effort cache of the
    /// authoritative by-email query and can lag it.
    pub async fn user_files(&self, email: &str) -> FileResult<(User, Vec<FileRecord>)> {
        if !is_valid_email(email) {
            return Err(FileError::InvalidInput("invalid email format".into()));
        }

        let user = sqlx::query_as::<_, User>(
            "SELECT id, first_name, last_name, email, created_at, updated_at \
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| FileError::NotFound("user not found".into()))?;

        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT f.id, f.name, f.stored_name, f.url, f.file_type, f.size, f.category, \
             f.duration, f.character_count, f.tags, f.description, f.email, f.uploaded_by, \
             f.created_at, f.updated_at \
             FROM files f JOIN user_files uf ON uf.file_id = f.id \
             WHERE uf.user_id = ? ORDER BY f.created_at DESC",
        )
        .bind(user.id)
        .fetch_all(&*self.db)
        .await?;

        Ok((user, files))
    }

    /// Delete a record, its stored bytes (best-effort), and its owner
    /// linkage (best-effort).
    pub async fn delete(&self, raw_id: &str) -> FileResult<FileRecord> {
        let id = Uuid::parse_str(raw_id)
            .map_err(|_| FileError::InvalidInput("invalid file id format".into()))?;

        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| FileError::NotFound("file not found".into()))?;

        match self.store.delete(&record.stored_name).await {
            Ok(true) => debug!("removed stored bytes for {}", record.stored_name),
            Ok(false) => warn!("stored bytes already missing for {}", record.stored_name),
            Err(err) => warn!("could not remove stored bytes for {}: {}", record.stored_name, err),
        }

        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if let Err(err) = sqlx::query("DELETE FROM user_files WHERE file_id = ?")
            .bind(id)
            .execute(&*self.db)
            .await
        {
            warn!(file = %id, "could not detach file from owner sequence: {}", err);
        }

        Ok(record)
    }

    /// Inline preview of a stored object: full decoded content and stats
    /// for text-like extensions, a structured binary notice otherwise.
    pub async fn preview(&self, stored_name: &str) -> FileResult<Preview> {
        DiskStore::ensure_name_safe(stored_name)?;
        let path = self.store.path_for(stored_name);

        let meta = tokio::fs::metadata(&path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                FileError::NotFound(format!("file `{stored_name}` not found"))
            } else {
                FileError::Storage(err)
            }
        })?;
        let size = meta.len() as i64;
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let extension = std::path::Path::new(stored_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();

        if PREVIEW_TEXT_EXTENSIONS.contains(&extension.as_str()) {
            let bytes = tokio::fs::read(&path).await?;
            let content = metadata::decode_text(bytes);
            let stats = metadata::text_stats(&content);
            Ok(Preview::Text {
                content,
                stats,
                size,
                modified,
            })
        } else {
            Ok(Preview::Binary {
                size,
                modified,
                extension,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@b.com"));
    }
}
