//! Listing and file detail tests

use kdrive_core::domain::{FileId, FileType, SortType, SpecialFolder};
use kdrive_core::ports::IDriveApi;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, file_json, page, DRIVE};

#[tokio::test]
async fn test_first_page_sends_sort_and_limit() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/10/files"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(query_param("limit", "2"))
        .and(query_param("order_by", "last_modified_at"))
        .and(query_param("order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([file_json(11, 10, "a.txt", "file"), file_json(12, 10, "B", "dir")]),
            Some("next-1"),
            true,
            1_700_000_100,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = api
        .get_folder_files(DRIVE, FileId::new(10), None, SortType::RecentDate)
        .await
        .expect("listing failed");

    assert_eq!(result.data.len(), 2);
    assert_eq!(result.data[1].file_type, FileType::Dir);
    assert_eq!(result.data[1].sorted_name, "b");
    assert_eq!(result.next_cursor(), Some("next-1"));
    assert_eq!(result.response_at, 1_700_000_100);
}

#[tokio::test]
async fn test_next_page_sends_cursor() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/10/files"))
        .and(query_param("cursor", "next-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([file_json(13, 10, "c.txt", "file")]),
            None,
            false,
            1_700_000_200,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = api
        .get_folder_files(DRIVE, FileId::new(10), Some("next-1"), SortType::NameAz)
        .await
        .unwrap();

    assert_eq!(result.data.len(), 1);
    assert!(result.is_last());
}

#[tokio::test]
async fn test_gallery_lists_images_and_videos() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/search"))
        .and(query_param("types[]", "image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([file_json(30, 10, "cat.jpg", "file")]),
            None,
            false,
            5,
        )))
        .mount(&server)
        .await;

    let result = api
        .get_special_folder_files(DRIVE, SpecialFolder::Gallery, None, SortType::RecentDate)
        .await
        .unwrap();
    assert_eq!(result.data[0].name, "cat.jpg");
}

#[tokio::test]
async fn test_favorites_listing() {
    let (server, api) = common::setup_api_mock().await;
    common::mount_get(
        &server,
        "/3/drive/42/files/favorites",
        page(json!([file_json(21, 20, "fav.pdf", "file")]), None, false, 9),
    )
    .await;

    let result = api
        .get_special_folder_files(DRIVE, SpecialFolder::Favorites, None, SortType::NameAz)
        .await
        .unwrap();
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.data[0].parent_id, FileId::new(20));
}

#[tokio::test]
async fn test_file_details() {
    let (server, api) = common::setup_api_mock().await;
    common::mount_get(
        &server,
        "/3/drive/42/files/1",
        common::ok(file_json(1, 0, "Private", "dir")),
    )
    .await;

    let root = api
        .get_file_details(DRIVE, FileId::new(1))
        .await
        .unwrap()
        .expect("root should exist");
    assert!(root.is_folder());
    assert_eq!(root.name, "Private");
}

#[tokio::test]
async fn test_file_details_not_found_is_none() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "result": "error",
            "error": {"code": "object_not_found", "description": "File not found"}
        })))
        .mount(&server)
        .await;

    let details = api.get_file_details(DRIVE, FileId::new(999)).await.unwrap();
    assert!(details.is_none());
}

#[tokio::test]
async fn test_unauthorized_is_an_error() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/10/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = api
        .get_folder_files(DRIVE, FileId::new(10), None, SortType::NameAz)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<kdrive_api::ApiError>(),
        Some(kdrive_api::ApiError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/10/files"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = api
        .get_folder_files(DRIVE, FileId::new(10), None, SortType::NameAz)
        .await
        .unwrap_err();
    let api_err = err.downcast_ref::<kdrive_api::ApiError>().unwrap();
    assert!(api_err.is_transient());
}

#[tokio::test]
async fn test_throttled_request_is_retried() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/10/files"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    common::mount_get(
        &server,
        "/3/drive/42/files/10/files",
        page(json!([]), None, false, 1),
    )
    .await;

    let result = api
        .get_folder_files(DRIVE, FileId::new(10), None, SortType::NameAz)
        .await
        .unwrap();
    assert!(result.data.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/10/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = api
        .get_folder_files(DRIVE, FileId::new(10), None, SortType::NameAz)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<kdrive_api::ApiError>(),
        Some(kdrive_api::ApiError::InvalidResponse(_))
    ));
}
