use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;

use blobzip::client::BlobClient;
use blobzip::rest_types::DeleteFileRequest;

#[derive(Clone, Default)]
struct MockFiles {
    deleted: Arc<Mutex<Vec<String>>>,
}

async fn list_files() -> Json<Value> {
    Json(json!({
        "success": true,
        "count": 2,
        "files": [
            {
                "url": "http://blob.test/a1B2c3D4",
                "downloadUrl": "http://blob.test/a1B2c3D4?download=1",
                "pathname": "uploads/backup.zip",
                "size": 2048,
                "uploadedAt": "2026-08-24T12:00:00.000Z"
            },
            {
                "url": "http://blob.test/e5F6g7H8",
                "downloadUrl": "http://blob.test/e5F6g7H8?download=1",
                "pathname": "uploads/notes.txt",
                "size": 128,
                "uploadedAt": "2026-08-23T09:30:00.000Z"
            }
        ]
    }))
}

async fn delete_file(
    State(server): State<MockFiles>,
    Json(request): Json<DeleteFileRequest>,
) -> Json<Value> {
    if request.pathname == "uploads/missing.bin" {
        return Json(json!({"success": false, "error": "File not found"}));
    }
    server.deleted.lock().unwrap().push(request.pathname);
    Json(json!({"success": true, "message": "File deleted"}))
}

async fn spawn_server() -> (Url, MockFiles) {
    let state = MockFiles::default();
    let app = Router::new()
        .route("/api/files", get(list_files).delete(delete_file))
        .route("/f/hello.txt", get(|| async { "hello blobzip" }))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (Url::parse(&format!("http://{addr}/")).unwrap(), state)
}

#[tokio::test]
async fn lists_uploaded_files() {
    let (url, _state) = spawn_server().await;
    let client = BlobClient::new(url);

    let files = client.list_files().await.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].pathname, "uploads/backup.zip");
    assert_eq!(files[0].size, 2048);
    assert_eq!(files[1].pathname, "uploads/notes.txt");
}

#[tokio::test]
async fn deletes_by_pathname() {
    let (url, state) = spawn_server().await;
    let client = BlobClient::new(url);

    client.delete_file("uploads/backup.zip").await.unwrap();
    assert_eq!(
        state.deleted.lock().unwrap().as_slice(),
        ["uploads/backup.zip"]
    );
}

#[tokio::test]
async fn delete_surfaces_server_errors() {
    let (url, _state) = spawn_server().await;
    let client = BlobClient::new(url);

    let error = client.delete_file("uploads/missing.bin").await.unwrap_err();
    assert!(format!("{error:#}").contains("File not found"));
}

#[tokio::test]
async fn downloads_to_the_given_path() {
    let (url, _state) = spawn_server().await;
    let client = BlobClient::new(url.clone());

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("hello.txt");
    let written = client
        .download(url.join("f/hello.txt").unwrap(), &output)
        .await
        .unwrap();

    assert_eq!(written, "hello blobzip".len() as u64);
    assert_eq!(std::fs::read_to_string(output).unwrap(), "hello blobzip");
}
