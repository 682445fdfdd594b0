//! Maps a declared content type to a fixed category set.
//!
//! Classification is deterministic and total: exact MIME membership in the
//! per-category allow-lists wins, text-like filename extensions catch
//! mislabeled text uploads, and everything else is `Other`. An unrecognized
//! type never rejects an upload.

use crate::models::file_record::Category;

const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
];

const VIDEO_TYPES: &[&str] = &[
    "video/mp4",
    "video/avi",
    "video/mkv",
    "video/mov",
    "video/quicktime",
    "video/wmv",
    "video/flv",
];

const AUDIO_TYPES: &[&str] = &[
    "audio/mp3",
    "audio/mpeg",
    "audio/wav",
    "audio/flac",
    "audio/aac",
    "audio/ogg",
];

const TEXT_TYPES: &[&str] = &[
    "text/plain",
    "text/html",
    "text/css",
    "text/csv",
    "text/markdown",
    "text/javascript",
    "application/json",
    "application/xml",
];

const DOCUMENT_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const SPREADSHEET_TYPES: &[&str] = &[
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const PRESENTATION_TYPES: &[&str] = &[
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

const ARCHIVE_TYPES: &[&str] = &[
    "application/zip",
    "application/rar",
    "application/x-rar-compressed",
    "application/x-7z-compressed",
];

/// Extensions accepted as text when the declared MIME type says nothing useful.
const TEXT_EXTENSIONS: &[&str] = &[".txt", ".md", ".json", ".xml", ".csv"];

/// Classify a declared MIME type (plus the original filename as a fallback
/// signal) into exactly one [`Category`].
pub fn classify(mime_type: &str, filename: &str) -> Category {
    let mime = mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_ascii_lowercase();

    let tables: &[(&[&str], Category)] = &[
        (IMAGE_TYPES, Category::Image),
        (VIDEO_TYPES, Category::Video),
        (AUDIO_TYPES, Category::Audio),
        (TEXT_TYPES, Category::Text),
        (DOCUMENT_TYPES, Category::Document),
        (SPREADSHEET_TYPES, Category::Spreadsheet),
        (PRESENTATION_TYPES, Category::Presentation),
        (ARCHIVE_TYPES, Category::Archive),
    ];

    if mime == "application/pdf" {
        return Category::Pdf;
    }
    for (types, category) in tables {
        if types.contains(&mime.as_str()) {
            return *category;
        }
    }

    let lower = filename.to_ascii_lowercase();
    if TEXT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Category::Text;
    }

    Category::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_allow_listed_type_maps_to_its_category() {
        let cases: &[(&[&str], Category)] = &[
            (IMAGE_TYPES, Category::Image),
            (VIDEO_TYPES, Category::Video),
            (AUDIO_TYPES, Category::Audio),
            (TEXT_TYPES, Category::Text),
            (DOCUMENT_TYPES, Category::Document),
            (SPREADSHEET_TYPES, Category::Spreadsheet),
            (PRESENTATION_TYPES, Category::Presentation),
            (ARCHIVE_TYPES, Category::Archive),
        ];
        for (types, expected) in cases {
            for mime in *types {
                assert_eq!(classify(mime, "file.bin"), *expected, "mime {mime}");
            }
        }
    }

    #[test]
    fn pdf_is_its_own_category() {
        assert_eq!(classify("application/pdf", "report.pdf"), Category::Pdf);
    }

    #[test]
    fn unknown_type_falls_back_to_other() {
        assert_eq!(classify("application/x-houdini", "scene.hip"), Category::Other);
        assert_eq!(classify("", "blob"), Category::Other);
    }

    #[test]
    fn text_extension_rescues_unknown_mime() {
        assert_eq!(classify("application/octet-stream", "notes.txt"), Category::Text);
        assert_eq!(classify("application/octet-stream", "README.MD"), Category::Text);
        assert_eq!(classify("binary/x-unknown", "data.csv"), Category::Text);
        assert_eq!(classify("application/octet-stream", "movie.mkv"), Category::Other);
    }

    #[test]
    fn mime_parameters_and_case_are_ignored() {
        assert_eq!(classify("Text/Plain; charset=utf-8", "a"), Category::Text);
        assert_eq!(classify("IMAGE/PNG", "a.png"), Category::Image);
    }
}
