//! Category-specific metadata derivation for stored files.
//!
//! Extraction never fails an ingestion: text decoding degrades from strict
//! UTF-8 to lossy to a zero count, and media duration is a bitrate
//! heuristic over the declared size, not a parsed container duration. No
//! binary headers are read and no external processes are spawned.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::file_record::Category;

/// Bitrate assumptions (kbps) keyed by recognizable sub-type substrings of
/// the declared MIME type. First match wins; unrecognized media defaults to
/// 128 kbps.
const BITRATE_TABLE: &[(&str, i64)] = &[
    ("mp3", 128),
    ("wav", 1411),
    ("flac", 1000),
    ("mp4", 1000),
    ("avi", 1500),
    ("mkv", 2000),
];

const DEFAULT_BITRATE_KBPS: i64 = 128;

/// Optional metadata fields derived during ingestion.
#[derive(Clone, Copy, Debug, Default)]
pub struct Derived {
    pub duration: Option<i64>,
    pub character_count: Option<i64>,
}

/// Full text statistics, reported by the preview endpoint.
#[derive(Serialize, Clone, Copy, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub character_count: i64,
    pub word_count: i64,
    pub line_count: i64,
}

pub fn text_stats(content: &str) -> TextStats {
    TextStats {
        character_count: content.chars().count() as i64,
        word_count: content.split_whitespace().count() as i64,
        line_count: content.split('\n').count() as i64,
    }
}

/// Decode stored bytes as text, replacing invalid sequences rather than
/// failing.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

fn bitrate_kbps(mime_type: &str) -> i64 {
    let mime = mime_type.to_ascii_lowercase();
    BITRATE_TABLE
        .iter()
        .find(|(sub, _)| mime.contains(sub))
        .map(|(_, kbps)| *kbps)
        .unwrap_or(DEFAULT_BITRATE_KBPS)
}

/// Estimate playback seconds from size and assumed bitrate, rounded to the
/// nearest second with a floor of 1.
pub fn estimate_duration(size_bytes: i64, mime_type: &str) -> i64 {
    let kbps = bitrate_kbps(mime_type);
    let seconds = (size_bytes as f64 * 8.0 / (kbps as f64 * 1000.0)).round() as i64;
    seconds.max(1)
}

/// Derive the category-specific metadata for a freshly stored file.
pub async fn extract(
    category: Category,
    stored_path: &Path,
    declared_size: i64,
    mime_type: &str,
) -> Derived {
    match category {
        Category::Text => {
            let character_count = match tokio::fs::read(stored_path).await {
                Ok(bytes) => {
                    let content = decode_text(bytes);
                    let stats = text_stats(&content);
                    debug!(
                        chars = stats.character_count,
                        words = stats.word_count,
                        lines = stats.line_count,
                        "text metadata for {}",
                        stored_path.display()
                    );
                    stats.character_count
                }
                Err(err) => {
                    warn!(
                        "could not read {} for text stats: {}",
                        stored_path.display(),
                        err
                    );
                    0
                }
            };
            Derived {
                duration: None,
                character_count: Some(character_count),
            }
        }
        Category::Audio | Category::Video => Derived {
            duration: Some(estimate_duration(declared_size, mime_type)),
            character_count: None,
        },
        _ => Derived::default(),
    }
}
