//! End-to-end HTTP tests covering the upload, listing, serving, preview,
//! and delete flows against an in-memory database and a temp storage root.

use std::sync::Arc;

use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use chrono::Utc;
use serde_json::Value;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use uuid::Uuid;

use filevault::routes::routes::routes;
use filevault::services::{disk_store::DiskStore, file_service::FileService, notify::Notifier};

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

async fn create_test_server() -> (TestServer, Arc<SqlitePool>, tempfile::TempDir) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");

    let schema = include_str!("../migrations/0001_init.sql");
    for stmt in schema.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(stmt).execute(&pool).await.expect("schema");
    }

    let db = Arc::new(pool);
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DiskStore::new(dir.path()).expect("disk store");
    let service = FileService::new(db.clone(), store, Notifier::spawn());

    let server = TestServer::new(routes(MAX_UPLOAD_BYTES).with_state(service))
        .expect("test server");
    (server, db, dir)
}

async fn insert_user(db: &SqlitePool, first: &str, last: &str, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, first_name, last_name, email, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(first)
    .bind(last)
    .bind(email)
    .bind(now)
    .bind(now)
    .execute(db)
    .await
    .expect("insert user");
    id
}

fn upload_form(name: &str, mime: &str, bytes: &[u8], email: Option<&str>) -> MultipartForm {
    let part = Part::bytes(bytes.to_vec())
        .file_name(name.to_string())
        .mime_type(mime.to_string());
    let mut form = MultipartForm::new().add_part("file", part);
    if let Some(email) = email {
        form = form.add_text("email", email.to_string());
    }
    form
}

async fn upload(server: &TestServer, name: &str, mime: &str, bytes: &[u8], email: &str) -> Value {
    let response = server
        .post("/files/upload")
        .multipart(upload_form(name, mime, bytes, Some(email)))
        .await;
    assert_eq!(response.status_code(), 200, "upload failed: {}", response.text());
    response.json::<Value>()
}

#[tokio::test]
async fn upload_text_file_derives_metadata() {
    let (server, _db, _dir) = create_test_server().await;

    let body = upload(&server, "notes.txt", "text/plain", b"hello world", "a@b.com").await;
    assert_eq!(body["success"], true);

    let file = &body["file"];
    assert_eq!(file["originalName"], "notes.txt");
    assert_eq!(file["category"], "text");
    assert_eq!(file["size"], 11);
    assert_eq!(file["characterCount"], 11);
    assert_eq!(file["sizeFormatted"], "11 Bytes");
    assert_eq!(file["email"], "a@b.com");
    assert!(file.get("duration").is_none());

    let stored = file["storedName"].as_str().unwrap();
    assert!(stored.starts_with("notes_") && stored.ends_with(".txt"));
    assert_eq!(file["url"], format!("/files/serve/{stored}"));
}

#[tokio::test]
async fn upload_empty_text_file_counts_zero_characters() {
    let (server, _db, _dir) = create_test_server().await;
    let body = upload(&server, "empty.txt", "text/plain", b"", "a@b.com").await;
    assert_eq!(body["file"]["characterCount"], 0);
    assert_eq!(body["file"]["size"], 0);
}

#[tokio::test]
async fn upload_audio_estimates_duration_from_bitrate() {
    let (server, _db, _dir) = create_test_server().await;

    let bytes = vec![0u8; 1_280_000];
    let body = upload(&server, "clip.mp3", "audio/mp3", &bytes, "a@b.com").await;

    let file = &body["file"];
    assert_eq!(file["category"], "audio");
    assert_eq!(file["duration"], 80);
    assert_eq!(file["durationFormatted"], "1:20");
    assert!(file.get("characterCount").is_none());
}

#[tokio::test]
async fn upload_without_owner_is_rejected() {
    let (server, _db, _dir) = create_test_server().await;

    let response = server
        .post("/files/upload")
        .multipart(upload_form("notes.txt", "text/plain", b"hi", None))
        .await;
    assert_eq!(response.status_code(), 400);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let (server, _db, _dir) = create_test_server().await;

    let response = server
        .post("/files/upload")
        .multipart(MultipartForm::new().add_text("email", "a@b.com"))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["message"], "no file uploaded");
}

#[tokio::test]
async fn identical_names_store_under_distinct_names() {
    let (server, _db, _dir) = create_test_server().await;

    let first = upload(&server, "clip.mp3", "audio/mp3", b"one", "a@b.com").await;
    let second = upload(&server, "clip.mp3", "audio/mp3", b"two", "a@b.com").await;

    let a = first["file"]["storedName"].as_str().unwrap();
    let b = second["file"]["storedName"].as_str().unwrap();
    assert_ne!(a, b);

    // Both payloads remain independently addressable.
    let resp_a = server.get(&format!("/files/serve/{a}")).await;
    let resp_b = server.get(&format!("/files/serve/{b}")).await;
    assert_eq!(resp_a.text(), "one");
    assert_eq!(resp_b.text(), "two");
}

#[tokio::test]
async fn list_filters_by_owner_and_sorts_newest_first() {
    let (server, _db, _dir) = create_test_server().await;

    upload(&server, "first.txt", "text/plain", b"first", "a@b.com").await;
    upload(&server, "other.txt", "text/plain", b"other", "someone@else.com").await;
    upload(&server, "second.txt", "text/plain", b"second", "a@b.com").await;

    let response = server
        .get("/files/allfiles")
        .add_query_param("email", "a@b.com")
        .await;
    assert_eq!(response.status_code(), 200);
    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["userEmail"], "a@b.com");

    let files = body["files"].as_array().unwrap();
    assert_eq!(files[0]["name"], "second.txt");
    assert_eq!(files[1]["name"], "first.txt");

    assert_eq!(body["summary"]["totalFiles"], 2);
    assert_eq!(body["summary"]["categories"]["text"], 2);
}

#[tokio::test]
async fn list_without_email_returns_everything() {
    let (server, _db, _dir) = create_test_server().await;

    upload(&server, "a.txt", "text/plain", b"a", "a@b.com").await;
    upload(&server, "b.txt", "text/plain", b"b", "c@d.com").await;

    let body = server.get("/files/allfiles").await.json::<Value>();
    assert_eq!(body["count"], 2);
    assert_eq!(body["userEmail"], "all users");
}

#[tokio::test]
async fn list_with_malformed_email_is_rejected() {
    let (server, _db, _dir) = create_test_server().await;

    let response = server
        .get("/files/allfiles")
        .add_query_param("email", "not-an-email")
        .await;
    assert_eq!(response.status_code(), 400);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "invalid email format");
}

#[tokio::test]
async fn user_files_reads_the_linked_sequence() {
    let (server, db, _dir) = create_test_server().await;
    insert_user(&db, "Ada", "Lovelace", "ada@example.com").await;

    upload(&server, "notes.txt", "text/plain", b"hello", "ada@example.com").await;

    let response = server
        .get("/files/user-files")
        .add_query_param("email", "ada@example.com")
        .await;
    assert_eq!(response.status_code(), 200);
    let body = response.json::<Value>();
    assert_eq!(body["count"], 1);
    assert_eq!(body["owner"]["firstName"], "Ada");
    assert_eq!(body["owner"]["totalFiles"], 1);
    assert_eq!(body["files"][0]["name"], "notes.txt");
}

#[tokio::test]
async fn user_files_requires_a_known_owner() {
    let (server, _db, _dir) = create_test_server().await;

    let missing = server.get("/files/user-files").await;
    assert_eq!(missing.status_code(), 400);

    let unknown = server
        .get("/files/user-files")
        .add_query_param("email", "ghost@example.com")
        .await;
    assert_eq!(unknown.status_code(), 404);
}

#[tokio::test]
async fn upload_by_user_id_records_sentinel_email_and_links_owner() {
    let (server, db, _dir) = create_test_server().await;
    let user_id = insert_user(&db, "Ada", "Lovelace", "ada@example.com").await;

    let form = MultipartForm::new()
        .add_part(
            "file",
            Part::bytes(b"by id".to_vec())
                .file_name("byid.txt")
                .mime_type("text/plain"),
        )
        .add_text("userId", user_id.to_string());
    let response = server.post("/files/upload").multipart(form).await;
    assert_eq!(response.status_code(), 200);
    let body = response.json::<Value>();
    assert_eq!(body["file"]["email"], "unknown@example.com");

    // Linked by the resolved id even though no email was declared.
    let linked = server
        .get("/files/user-files")
        .add_query_param("email", "ada@example.com")
        .await
        .json::<Value>();
    assert_eq!(linked["count"], 1);
    assert_eq!(linked["files"][0]["name"], "byid.txt");
}

#[tokio::test]
async fn serve_streams_bytes_with_caching_headers() {
    let (server, _db, _dir) = create_test_server().await;
    let body = upload(&server, "notes.txt", "text/plain", b"hello world", "a@b.com").await;
    let stored = body["file"]["storedName"].as_str().unwrap().to_string();

    let response = server.get(&format!("/files/serve/{stored}")).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), "hello world");
    assert!(
        response
            .header("content-type")
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    assert_eq!(response.header("cache-control"), "public, max-age=3600");
    assert_eq!(response.header("content-length"), "11");
}

#[tokio::test]
async fn download_forces_attachment_with_reconstructed_name() {
    let (server, _db, _dir) = create_test_server().await;
    let body = upload(&server, "notes.txt", "text/plain", b"hello world", "a@b.com").await;
    let stored = body["file"]["storedName"].as_str().unwrap().to_string();

    let response = server.get(&format!("/files/download/{stored}")).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"notes.txt\""
    );
    assert_eq!(response.header("content-type"), "application/octet-stream");
    assert_eq!(response.header("cache-control"), "no-cache");
    assert_eq!(response.text(), "hello world");
}

#[tokio::test]
async fn preview_returns_text_content_and_stats() {
    let (server, _db, _dir) = create_test_server().await;
    let body = upload(&server, "notes.txt", "text/plain", b"hello world", "a@b.com").await;
    let stored = body["file"]["storedName"].as_str().unwrap().to_string();

    let preview = server
        .get(&format!("/files/content/{stored}"))
        .await
        .json::<Value>();
    assert_eq!(preview["success"], true);
    assert_eq!(preview["fileType"], "text");
    assert_eq!(preview["content"], "hello world");
    assert_eq!(preview["stats"]["characterCount"], 11);
    assert_eq!(preview["stats"]["wordCount"], 2);
    assert_eq!(preview["stats"]["lineCount"], 1);
}

#[tokio::test]
async fn preview_of_binary_points_at_serve_route() {
    let (server, _db, _dir) = create_test_server().await;
    let body = upload(
        &server,
        "blob.bin",
        "application/octet-stream",
        &[0u8, 1, 2, 3],
        "a@b.com",
    )
    .await;
    let stored = body["file"]["storedName"].as_str().unwrap().to_string();

    let preview = server
        .get(&format!("/files/content/{stored}"))
        .await
        .json::<Value>();
    assert_eq!(preview["fileType"], "binary");
    assert_eq!(preview["serveUrl"], format!("/files/serve/{stored}"));
    assert_eq!(preview["stats"]["fileSize"], 4);
    assert_eq!(preview["stats"]["extension"], ".bin");
}

#[tokio::test]
async fn serve_of_unknown_name_is_not_found() {
    let (server, _db, _dir) = create_test_server().await;
    let response = server.get("/files/serve/ghost_123.txt").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn delete_removes_record_bytes_and_linkage() {
    let (server, db, _dir) = create_test_server().await;
    insert_user(&db, "Ada", "Lovelace", "ada@example.com").await;

    let body = upload(&server, "notes.txt", "text/plain", b"hello", "ada@example.com").await;
    let id = body["file"]["id"].as_str().unwrap().to_string();
    let stored = body["file"]["storedName"].as_str().unwrap().to_string();

    let response = server.delete(&format!("/files/delete/{id}")).await;
    assert_eq!(response.status_code(), 200);
    let deleted = response.json::<Value>();
    assert_eq!(deleted["success"], true);
    assert_eq!(deleted["deletedFile"]["name"], "notes.txt");

    // Gone from listings, the owner's sequence, and disk.
    let listed = server
        .get("/files/allfiles")
        .add_query_param("email", "ada@example.com")
        .await
        .json::<Value>();
    assert_eq!(listed["count"], 0);

    let linked = server
        .get("/files/user-files")
        .add_query_param("email", "ada@example.com")
        .await
        .json::<Value>();
    assert_eq!(linked["count"], 0);

    assert_eq!(
        server.get(&format!("/files/serve/{stored}")).await.status_code(),
        404
    );

    // A second delete reports NotFound rather than crashing.
    let again = server.delete(&format!("/files/delete/{id}")).await;
    assert_eq!(again.status_code(), 404);
}

#[tokio::test]
async fn delete_with_malformed_id_is_rejected() {
    let (server, _db, _dir) = create_test_server().await;
    let response = server.delete("/files/delete/not-a-uuid").await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["message"], "invalid file id format");
}

#[tokio::test]
async fn health_endpoints_respond() {
    let (server, _db, _dir) = create_test_server().await;
    assert_eq!(server.get("/healthz").await.status_code(), 200);

    let ready = server.get("/readyz").await;
    assert_eq!(ready.status_code(), 200);
    let body = ready.json::<Value>();
    assert_eq!(body["status"], "ok");
}
