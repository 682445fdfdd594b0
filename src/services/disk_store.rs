//! On-disk payload storage with collision-resistant naming.
//!
//! Stored names combine the original file stem with a millisecond
//! timestamp and keep the extension (`notes_1712345678901.txt`), so two
//! uploads of the same filename land under distinct names. Payloads live
//! flat under a single storage root; writes go through a temp file with
//! fsync and an atomic rename.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::Utc;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

use super::file_service::{FileError, FileResult};

const MAX_STORED_NAME_LEN: usize = 255;

/// Physical byte storage rooted at a single directory.
#[derive(Clone, Debug)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open a store rooted at `root`, creating the directory if absent.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public access path for a stored name.
    pub fn url_for(stored_name: &str) -> String {
        format!("/files/serve/{stored_name}")
    }

    /// Absolute path of a stored name under the storage root.
    pub fn path_for(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    /// Reject names that could escape the storage root.
    ///
    /// Stored names are single flat path segments; separators, `..`, and
    /// control bytes have no business in them.
    pub fn ensure_name_safe(name: &str) -> FileResult<()> {
        if name.is_empty() || name.len() > MAX_STORED_NAME_LEN {
            return Err(FileError::InvalidInput("invalid file name".into()));
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(FileError::InvalidInput("invalid file name".into()));
        }
        if name.bytes().any(|b| b.is_ascii_control()) {
            return Err(FileError::InvalidInput("invalid file name".into()));
        }
        Ok(())
    }

    /// Derive a fresh stored name for an original filename.
    ///
    /// Bumps the timestamp until the name is free of any existing object.
    /// Two sub-millisecond concurrent uploads of the same name can still
    /// race the existence check; that window is accepted.
    async fn next_stored_name(&self, original_name: &str) -> FileResult<String> {
        let path = Path::new(original_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("file");
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let mut millis = Utc::now().timestamp_millis();
        loop {
            let candidate = format!("{stem}_{millis}{ext}");
            Self::ensure_name_safe(&candidate)?;
            if !self.path_for(&candidate).exists() {
                return Ok(candidate);
            }
            millis += 1;
        }
    }

    /// Persist payload bytes under a fresh stored name and return it.
    ///
    /// Writes to a temp file, fsyncs, then renames into place so a failed
    /// write never leaves a partial object under a stored name.
    pub async fn store(&self, bytes: &[u8], original_name: &str) -> FileResult<String> {
        let stored_name = self.next_stored_name(original_name).await?;
        let final_path = self.path_for(&stored_name);
        let tmp_path = self.root.join(format!(".tmp-{}", Uuid::new_v4()));

        let mut file = File::create(&tmp_path).await?;
        let result = async {
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &final_path).await
        }
        .await;

        if let Err(err) = result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(FileError::Storage(err));
        }

        debug!("stored {} ({} bytes)", stored_name, bytes.len());
        Ok(stored_name)
    }

    pub async fn exists(&self, stored_name: &str) -> bool {
        Self::ensure_name_safe(stored_name).is_ok()
            && fs::metadata(self.path_for(stored_name)).await.is_ok()
    }

    /// Open a stored object for streaming out, returning its byte length.
    pub async fn open_for_read(&self, stored_name: &str) -> FileResult<(File, u64)> {
        Self::ensure_name_safe(stored_name)?;
        let path = self.path_for(stored_name);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                FileError::NotFound(format!("file `{stored_name}` not found"))
            } else {
                FileError::Storage(err)
            }
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Remove a stored object. Returns `false` when it was already gone;
    /// callers treat that as observable but non-fatal.
    pub async fn delete(&self, stored_name: &str) -> FileResult<bool> {
        Self::ensure_name_safe(stored_name)?;
        match fs::remove_file(self.path_for(stored_name)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(FileError::Storage(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, DiskStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::new(dir.path()).expect("store");
        (dir, store)
    }

    #[tokio::test]
    async fn stores_and_reads_back() {
        let (_dir, store) = temp_store();
        let stored = store.store(b"hello world", "notes.txt").await.unwrap();
        assert!(stored.ends_with(".txt"));
        assert!(stored.starts_with("notes_"));
        assert!(store.exists(&stored).await);

        let (_file, len) = store.open_for_read(&stored).await.unwrap();
        assert_eq!(len, 11);
    }

    #[tokio::test]
    async fn identical_original_names_get_distinct_stored_names() {
        let (_dir, store) = temp_store();
        let a = store.store(b"one", "clip.mp3").await.unwrap();
        let b = store.store(b"two", "clip.mp3").await.unwrap();
        assert_ne!(a, b);
        assert!(store.exists(&a).await);
        assert!(store.exists(&b).await);
    }

    #[tokio::test]
    async fn delete_reports_missing_objects() {
        let (_dir, store) = temp_store();
        let stored = store.store(b"bytes", "a.bin").await.unwrap();
        assert!(store.delete(&stored).await.unwrap());
        assert!(!store.delete(&stored).await.unwrap());
        assert!(!store.exists(&stored).await);
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let (_dir, store) = temp_store();
        for name in ["../etc/passwd", "a/b.txt", "a\\b.txt", "", "x\0y"] {
            assert!(store.open_for_read(name).await.is_err(), "name {name:?}");
        }
    }

    #[tokio::test]
    async fn open_missing_is_not_found() {
        let (_dir, store) = temp_store();
        match store.open_for_read("ghost_123.txt").await {
            Err(FileError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn url_points_at_serve_route() {
        assert_eq!(
            DiskStore::url_for("notes_1712.txt"),
            "/files/serve/notes_1712.txt"
        );
    }
}
