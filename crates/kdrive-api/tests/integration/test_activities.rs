//! Activity feed tests

use kdrive_core::domain::{FileAction, FileId};
use kdrive_core::ports::IDriveApi;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, file_json, page, DRIVE};

#[tokio::test]
async fn test_activities_since_last_fetch() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/10/activities"))
        .and(query_param("from_date", "1700000000"))
        .and(query_param("depth", "children"))
        .and(query_param("with", "file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([
                {
                    "id": 1,
                    "action": "file_create",
                    "file_id": 15,
                    "created_at": 1_700_000_010,
                    "file": file_json(15, 10, "new.txt", "file")
                },
                {"id": 2, "action": "file_trash", "file_id": 11, "created_at": 1_700_000_020},
                {"id": 3, "action": "comment_like", "file_id": 15, "created_at": 1_700_000_030}
            ]),
            Some("act-2"),
            true,
            1_700_000_050,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = api
        .get_file_activities(DRIVE, FileId::new(10), None, Some(1_700_000_000), false)
        .await
        .unwrap();

    assert_eq!(result.data.len(), 3);
    assert_eq!(result.data[0].action, FileAction::FileCreate);
    assert_eq!(result.data[0].file.as_ref().unwrap().name, "new.txt");
    assert!(result.data[1].file.is_none());
    assert_eq!(result.data[2].action, FileAction::CommentLike);
    assert_eq!(result.next_cursor(), Some("act-2"));
    assert_eq!(result.response_at, 1_700_000_050);
}

#[tokio::test]
async fn test_recursive_activities() {
    let (server, api) = common::setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/3/drive/42/files/1/activities"))
        .and(query_param("depth", "unlimited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), None, false, 7)))
        .expect(1)
        .mount(&server)
        .await;

    let result = api
        .get_file_activities(DRIVE, FileId::new(1), None, None, true)
        .await
        .unwrap();
    assert!(result.data.is_empty());
    assert!(result.is_last());
}

#[tokio::test]
async fn test_missing_response_at_maps_to_zero() {
    let (server, api) = common::setup_api_mock().await;
    common::mount_get(
        &server,
        "/3/drive/42/files/10/activities",
        json!({"result": "success", "data": []}),
    )
    .await;

    let result = api
        .get_file_activities(DRIVE, FileId::new(10), None, None, false)
        .await
        .unwrap();
    assert_eq!(result.response_at, 0);
}
