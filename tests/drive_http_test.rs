mod common;

use std::io::Write;
use std::sync::atomic::Ordering;

use google_services::{Error, RemoteErrorKind};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{services_at, TEST_TOKEN};

#[tokio::test]
async fn test_get_files_follows_page_tokens() {
    let server = MockServer::start().await;

    // Mounted first so it wins over the catch-all first page below.
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "page_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "f3", "name": "test_folder"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "name = 'test_folder'"))
        .and(query_param("fields", "nextPageToken, files(id, name)"))
        .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nextPageToken": "page_2",
            "files": [
                {"id": "f1", "name": "test_folder"},
                {"id": "f2", "name": "test_folder"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (services, flow) = services_at(&server.uri());
    let files = services
        .drive()
        .get_files("name = 'test_folder'", None)
        .await
        .unwrap();

    let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["f1", "f2", "f3"]);
    assert_eq!(flow.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_files_with_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    let files = services.drive().get_files("name = 'nothing'", None).await.unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_create_folder_sends_folder_mime_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(body_partial_json(json!({
            "name": "test_folder",
            "mimeType": "application/vnd.google-apps.folder"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "folder_1",
            "name": "test_folder"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    let folder = services.drive().create_folder("test_folder", None).await.unwrap();
    assert_eq!(folder.id, "folder_1");
}

#[tokio::test]
async fn test_create_file_uploads_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains(r#""name":"report.txt""#))
        .and(body_string_contains(r#""parents":["folder_1"]"#))
        .and(body_string_contains("quarterly numbers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file_1",
            "name": "report.txt"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut local = tempfile::NamedTempFile::new().unwrap();
    write!(local, "quarterly numbers").unwrap();

    let (services, _) = services_at(&server.uri());
    let created = services
        .drive()
        .create_file(local.path(), Some("report.txt"), Some("folder_1"), None)
        .await
        .unwrap();
    assert_eq!(created.id, "file_1");
}

#[tokio::test]
async fn test_update_file_adds_parent_through_query() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/upload/drive/v3/files/file_1"))
        .and(query_param("addParents", "folder_2"))
        .and(body_string_contains("new content"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file_1",
            "name": "report.txt"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut local = tempfile::NamedTempFile::new().unwrap();
    write!(local, "new content").unwrap();

    let (services, _) = services_at(&server.uri());
    services
        .drive()
        .update_file(local.path(), "file_1", Some("report.txt"), Some("folder_2"), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_download_file_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/file_1"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"file bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    let data = services.drive().download_file("file_1", None).await.unwrap();
    assert_eq!(data, b"file bytes");
}

#[tokio::test]
async fn test_delete_file_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/folder_1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    services.drive().delete_file("folder_1", None).await.unwrap();
}

#[tokio::test]
async fn test_not_found_is_translated() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "File not found: missing."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    let err = services.drive().delete_file("missing", None).await.unwrap_err();

    match err {
        Error::RemoteApi(e) => {
            assert_eq!(e.kind, RemoteErrorKind::NotFound);
            assert_eq!(e.status, Some(404));
            assert_eq!(e.message, "File not found: missing.");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "f1", "name": "a"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    let files = services.drive().get_files("trashed = false", None).await.unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    // One attempt plus two retries.
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    let err = services.drive().get_files("trashed = false", None).await.unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::Server));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "Invalid Value"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    let err = services.drive().get_files("bad query", None).await.unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::BadRequest));
}

#[tokio::test]
async fn test_user_rate_limit_on_403_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "message": "User Rate Limit Exceeded",
                "errors": [{"domain": "usageLimits", "reason": "userRateLimitExceeded"}]
            }
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "f1", "name": "a"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    let files = services.drive().get_files("trashed = false", None).await.unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_folder_creation_not_replayed_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (services, _) = services_at(&server.uri());
    let err = services.drive().create_folder("test_folder", None).await.unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::Server));
}
