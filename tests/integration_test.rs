//! Hermetic HTTP-level integration tests against a local mock server,
//! exercising `Pan123Session` the way a caller actually would rather than
//! poking individual `src/api/*` functions directly.
//!
//! Unlike a live-credentials suite, these always run: `wiremock` stands in
//! for the provider, and a pre-seeded long-lived token skips the auth
//! exchange entirely.

use chrono::{Duration, Utc};
use pan123_core::model::PersistedToken;
use pan123_core::Pan123Config;
use pan123_core::Pan123Session;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(control_host: String) -> Pan123Config {
    let token = PersistedToken {
        access_token: "test-access-token".to_string(),
        expiry: Utc::now() + Duration::hours(1),
    };
    Pan123Config::new()
        .client_id("test-client-id")
        .client_secret("test-client-secret")
        .token(Some(token))
        .user_agent("pan123-core-tests".to_string())
        .root_folder_id("0".to_string())
        .max_upload_parts(10_000u32)
        .upload_pacer_min_sleep_ms(Some(0))
        .download_pacer_min_sleep_ms(Some(0))
        .strict_pacer_min_sleep_ms(Some(0))
        .encoding(pan123_core::EncodingPolicy::default())
        .control_host_override(Some(control_host))
        .build()
}

#[tokio::test]
async fn list_root_directory_returns_non_trashed_entries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/file/list"))
        .and(query_param("parentFileId", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {
                "fileList": [
                    {"fileId": 1, "filename": "a.txt", "type": 0, "size": 10, "etag": "abc", "parentFileId": 0, "status": 0},
                    {"fileId": 2, "filename": "trashed.txt", "type": 0, "size": 5, "etag": "def", "parentFileId": 0, "status": 100},
                    {"fileId": 3, "filename": "sub", "type": 1, "size": 0, "etag": "", "parentFileId": 0, "status": 0}
                ],
                "lastFileId": -1
            }
        })))
        .mount(&server)
        .await;

    let session = Pan123Session::new(test_config(server.uri())).expect("session construction");
    let entries = session.list("/").await.expect("list should succeed");

    assert_eq!(entries.len(), 2, "trashed entry must be filtered out");
    assert!(entries.iter().any(|e| e.filename == "a.txt"));
    assert!(entries.iter().any(|e| e.filename == "sub" && e.is_dir()));
}

#[tokio::test]
async fn list_paginates_until_last_file_id_marker() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/file/list"))
        .and(query_param("lastFileId", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {
                "fileList": [
                    {"fileId": 1, "filename": "page1.txt", "type": 0, "size": 1, "etag": "a", "parentFileId": 0, "status": 0}
                ],
                "lastFileId": 42
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/file/list"))
        .and(query_param("lastFileId", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {
                "fileList": [
                    {"fileId": 2, "filename": "page2.txt", "type": 0, "size": 1, "etag": "b", "parentFileId": 0, "status": 0}
                ],
                "lastFileId": -1
            }
        })))
        .mount(&server)
        .await;

    let session = Pan123Session::new(test_config(server.uri())).expect("session construction");
    let entries = session.list("/").await.expect("list should succeed");

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.filename == "page1.txt"));
    assert!(entries.iter().any(|e| e.filename == "page2.txt"));
}

#[tokio::test]
async fn mkdir_tolerates_pre_existing_directory_via_duplicate_marker() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/v1/file/mkdir"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1,
            "message": "该目录下已经有同名文件夹",
            "data": null
        })))
        .mount(&server)
        .await;

    // Re-resolution after the collision falls back to listing the parent.
    Mock::given(method("GET"))
        .and(path("/api/v2/file/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {
                "fileList": [
                    {"fileId": 99, "filename": "existing-dir", "type": 1, "size": 0, "etag": "", "parentFileId": 0, "status": 0}
                ],
                "lastFileId": -1
            }
        })))
        .mount(&server)
        .await;

    let session = Pan123Session::new(test_config(server.uri())).expect("session construction");
    let id = session
        .mkdir("/existing-dir")
        .await
        .expect("mkdir should recover from the duplicate-directory collision");
    assert_eq!(id, 99);
}

#[tokio::test]
async fn remove_absorbs_the_empty_data_success_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/file/trash"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": null
        })))
        .mount(&server)
        .await;

    let session = Pan123Session::new(test_config(server.uri())).expect("session construction");
    session
        .remove(123)
        .await
        .expect("a null-data success envelope must not be treated as an error");
}

#[tokio::test]
async fn rename_propagates_a_terminal_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/file/name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 9,
            "message": "file not found",
            "data": null
        })))
        .mount(&server)
        .await;

    let session = Pan123Session::new(test_config(server.uri())).expect("session construction");
    let err = session
        .rename(123, "new-name.txt")
        .await
        .expect_err("a non-absorbed, non-zero code must surface as an error");
    match err {
        pan123_core::Pan123Error::Api { code, .. } => assert_eq!(code, 9),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn about_decodes_account_quota() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {
                "spacePermanent": 1000,
                "spaceTemp": 0,
                "spaceUsed": 400
            }
        })))
        .mount(&server)
        .await;

    let session = Pan123Session::new(test_config(server.uri())).expect("session construction");
    let quota = session.about().await.expect("about should succeed");
    assert_eq!(quota.space_permanent, 1000);
    assert_eq!(quota.space_used, 400);
}

#[tokio::test]
async fn single_shot_put_uploads_small_payload_and_returns_file_id() {
    let server = MockServer::start().await;

    // The upload-domain lookup itself goes over the control host; point it
    // back at this same mock server so the subsequent single/create call
    // doesn't escape to a real hard-coded fallback host.
    Mock::given(method("GET"))
        .and(path("/upload/v2/file/domain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": [server.uri()]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/file/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {"fileList": [], "lastFileId": -1}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload/v2/file/single/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {"fileID": 555, "completed": true}
        })))
        .mount(&server)
        .await;

    let session = Pan123Session::new(test_config(server.uri())).expect("session construction");
    let source = pan123_core::upload::UploadSource::from_bytes(&b"hello world"[..]);
    let file_id = session
        .put("/", "hello.txt", "5eb63bbbe01eeed093cb22bb8f5acdc3", &source)
        .await
        .expect("single-shot put should succeed");
    assert_eq!(file_id, 555);
}

#[tokio::test]
async fn nested_path_resolves_through_each_intermediate_directory() {
    let server = MockServer::start().await;

    // Root listing: only "docs" (a directory) is visible.
    Mock::given(method("GET"))
        .and(path("/api/v2/file/list"))
        .and(query_param("parentFileId", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {
                "fileList": [
                    {"fileId": 10, "filename": "docs", "type": 1, "size": 0, "etag": "", "parentFileId": 0, "status": 0}
                ],
                "lastFileId": -1
            }
        })))
        .mount(&server)
        .await;

    // Inside "docs" (id 10): a single file "readme.txt".
    Mock::given(method("GET"))
        .and(path("/api/v2/file/list"))
        .and(query_param("parentFileId", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {
                "fileList": [
                    {"fileId": 11, "filename": "readme.txt", "type": 0, "size": 4, "etag": "xyz", "parentFileId": 10, "status": 0}
                ],
                "lastFileId": -1
            }
        })))
        .mount(&server)
        .await;

    let session = Pan123Session::new(test_config(server.uri())).expect("session construction");
    let entries = session
        .list("/docs")
        .await
        .expect("listing a nested directory should resolve through the root first");

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filename, "readme.txt");
}
