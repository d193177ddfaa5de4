//! Write-through mutation tests

use kdrive_core::domain::FileId;
use kdrive_core::ports::IDriveApi;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, ok, DRIVE};

#[tokio::test]
async fn test_rename_posts_new_name() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/drive/42/files/11/rename"))
        .and(body_json(json!({"name": "renamed.txt"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(true))))
        .expect(1)
        .mount(&server)
        .await;

    api.rename_file(DRIVE, FileId::new(11), "renamed.txt")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_trash_uses_delete() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/2/drive/42/files/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(true))))
        .expect(1)
        .mount(&server)
        .await;

    api.trash_file(DRIVE, FileId::new(11)).await.unwrap();
}

#[tokio::test]
async fn test_update_color() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/drive/42/files/10/color"))
        .and(body_json(json!({"color": "#00ff00"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(true))))
        .expect(1)
        .mount(&server)
        .await;

    api.update_color(DRIVE, FileId::new(10), "#00ff00")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_favorite_add_and_remove() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/drive/42/files/11/favorite"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(true))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/2/drive/42/files/11/favorite"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(true))))
        .expect(1)
        .mount(&server)
        .await;

    api.add_favorite(DRIVE, FileId::new(11)).await.unwrap();
    api.remove_favorite(DRIVE, FileId::new(11)).await.unwrap();
}

#[tokio::test]
async fn test_create_and_delete_dropbox() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/drive/42/files/10/dropbox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({
            "id": 77,
            "url": "https://kdrive.infomaniak.com/app/collaborate/42/box",
            "created_at": 1_700_000_000,
            "has_password": false
        }))))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/2/drive/42/files/10/dropbox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(true))))
        .expect(1)
        .mount(&server)
        .await;

    let dropbox = api.create_dropbox(DRIVE, FileId::new(10)).await.unwrap();
    assert_eq!(dropbox.id, 77);
    assert!(dropbox.url.ends_with("/box"));

    api.delete_dropbox(DRIVE, FileId::new(10)).await.unwrap();
}

#[tokio::test]
async fn test_error_envelope_fails_mutation() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/drive/42/files/11/rename"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "error",
            "error": {"code": "conflict_error", "description": "Name already taken"}
        })))
        .mount(&server)
        .await;

    let err = api
        .rename_file(DRIVE, FileId::new(11), "taken.txt")
        .await
        .unwrap_err();
    match err.downcast_ref::<kdrive_api::ApiError>() {
        Some(kdrive_api::ApiError::Api { code, .. }) => assert_eq!(code, "conflict_error"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_mutation() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/2/drive/42/files/11"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    assert!(api.trash_file(DRIVE, FileId::new(11)).await.is_err());
}
