//! Represents a single uploaded file and its derived metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

/// Classification tag assigned to every uploaded file.
///
/// `classify` maps each declared content type into exactly one of these;
/// anything unrecognized lands in `Other`. Stored as lowercase TEXT.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Image,
    Video,
    Audio,
    Text,
    Document,
    Spreadsheet,
    Presentation,
    Archive,
    Pdf,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Video => "video",
            Category::Audio => "audio",
            Category::Text => "text",
            Category::Document => "document",
            Category::Spreadsheet => "spreadsheet",
            Category::Presentation => "presentation",
            Category::Archive => "archive",
            Category::Pdf => "pdf",
            Category::Other => "other",
        }
    }
}

/// A persisted file record.
///
/// The record stores the file's metadata, not the payload bytes; those live
/// on disk under the stored name. `duration` is present only for audio and
/// video, `character_count` only for text-like files.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Original human-readable filename as supplied by the uploader.
    pub name: String,

    /// Collision-resistant on-disk name (`<stem>_<millis><ext>`).
    pub stored_name: String,

    /// Public access path for the stored bytes.
    pub url: String,

    /// Declared MIME type (e.g. `image/png`).
    pub file_type: String,

    /// Payload length in bytes.
    pub size: i64,

    /// Classification derived from the declared type and filename.
    pub category: Category,

    /// Estimated playback length in seconds (audio/video only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    /// Decoded character count (text-like files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count: Option<i64>,

    /// Free-form tags, possibly empty.
    pub tags: Json<Vec<String>>,

    /// Free-form description, auto-generated when not supplied.
    pub description: String,

    /// Denormalized owner email.
    pub email: String,

    /// Owning user reference, when the owner resolved to a known user.
    pub uploaded_by: Option<Uuid>,

    /// When the record was created. Immutable.
    pub created_at: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}
