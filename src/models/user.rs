//! Represents a registered owner of uploaded files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An owner profile.
///
/// Registration and authentication live outside this service; rows are
/// provisioned by the identity collaborator. The files a user has ever been
/// linked to are kept in the `user_files` table, maintained best-effort on
/// upload and delete.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    pub first_name: String,

    pub last_name: String,

    /// Unique login / contact address. Also used to resolve file ownership.
    pub email: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}
