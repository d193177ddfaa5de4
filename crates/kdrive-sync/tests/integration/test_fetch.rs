//! Folder fetch, staleness and page loading against the real store

use futures::future::BoxFuture;
use kdrive_core::domain::{FileAction, SortType, SpecialFolder, UserDrive, UserId};
use kdrive_core::ports::{CursorPage, IFileRepository};
use kdrive_sync::{FetchOptions, FolderPage, SyncError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::*;

const LISTED_AT: i64 = 1_800_000_000;

/// Caches folder 10 with children 11 and 12
async fn cache_docs(h: &Harness, folder: kdrive_core::domain::File) {
    h.repo
        .upsert_folder(&folder, &[file(11, 10, "a.txt"), file(12, 10, "b.txt")], true)
        .await
        .unwrap();
}

/// Scripts a single-page listing of folder 10 with children 11, 12 and 13
fn script_docs_listing(h: &Harness) {
    h.api.listing(
        10,
        None,
        CursorPage::last(
            vec![
                file(11, 10, "a.txt"),
                file(12, 10, "b.txt"),
                file(13, 10, "c.txt"),
            ],
            LISTED_AT,
        ),
    );
}

/// Scripts two listing pages of folder 10: [11, 12, 13] then [14]
fn script_two_pages(h: &Harness) {
    h.api.listing(
        10,
        None,
        CursorPage::with_more(
            vec![
                file(11, 10, "a.txt"),
                file(12, 10, "b.txt"),
                file(13, 10, "c.txt"),
            ],
            "p2",
            LISTED_AT,
        ),
    );
    h.api.listing(
        10,
        Some("p2"),
        CursorPage::last(vec![file(14, 10, "d.txt")], LISTED_AT + 100),
    );
}

async fn assert_refetched(h: &Harness, options: FetchOptions) {
    script_docs_listing(h);

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, options)
        .await
        .unwrap()
        .expect("folder should be known");

    assert!(!contents.from_cache);
    assert_eq!(ids(&contents.children), vec![11, 12, 13]);
    assert!(h.api.calls().contains(&"files 10 None".to_string()));

    let folder = contents.folder;
    assert!(folder.is_complete);
    assert_eq!(folder.version_code, APP_VERSION);
    assert_eq!(folder.response_at, LISTED_AT);
    assert_eq!(folder.cursor, None);
    assert_eq!(child_ids(h.repo.as_ref(), 10).await, vec![11, 12, 13]);
}

// ============================================================================
// Staleness
// ============================================================================

#[tokio::test]
async fn test_fresh_folder_served_without_network() {
    let h = setup().await;
    cache_docs(&h, fresh(dir(10, 1, "Docs"))).await;

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert!(contents.from_cache);
    assert_eq!(contents.folder.name, "Docs");
    assert_eq!(ids(&contents.children), vec![11, 12]);
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn test_children_follow_requested_order() {
    let h = setup().await;
    cache_docs(&h, fresh(dir(10, 1, "Docs"))).await;

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameZa, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(ids(&contents.children), vec![12, 11]);
}

#[tokio::test]
async fn test_refetch_when_cache_bypass_requested() {
    let h = setup().await;
    cache_docs(&h, fresh(dir(10, 1, "Docs"))).await;
    assert_refetched(&h, FetchOptions::refresh()).await;
}

#[tokio::test]
async fn test_refetch_when_folder_missing() {
    let h = setup().await;
    h.api.detail(dir(10, 1, "Docs"));

    assert_refetched(&h, FetchOptions::default()).await;
    assert_eq!(
        h.api.calls(),
        vec![
            "details 10".to_string(),
            "files 10 None".to_string(),
            format!("activities 10 None Some({LISTED_AT})"),
        ]
    );
}

#[tokio::test]
async fn test_refetch_when_no_children_cached() {
    let h = setup().await;
    h.repo
        .upsert_folder(&fresh(dir(10, 1, "Docs")), &[], true)
        .await
        .unwrap();
    assert_refetched(&h, FetchOptions::default()).await;
}

#[tokio::test]
async fn test_refetch_when_listing_incomplete() {
    let h = setup().await;
    let mut folder = fresh(dir(10, 1, "Docs"));
    folder.is_complete = false;
    cache_docs(&h, folder).await;
    assert_refetched(&h, FetchOptions::default()).await;
}

#[tokio::test]
async fn test_refetch_when_written_by_outdated_version() {
    let h = setup().await;
    let mut folder = fresh(dir(10, 1, "Docs"));
    folder.version_code = MIN_VERSION - 1;
    cache_docs(&h, folder).await;
    assert_refetched(&h, FetchOptions::default()).await;
}

#[tokio::test]
async fn test_refetch_and_report_duplicate_children() {
    let h = setup().await;
    cache_docs(&h, fresh(dir(10, 1, "Docs"))).await;
    inject_duplicate_link(&h.store, 10, 11).await;
    assert_eq!(child_ids(h.repo.as_ref(), 10).await, vec![11, 12, 11]);

    assert_refetched(&h, FetchOptions::default()).await;

    let anomalies = h.reporter.anomalies.lock().unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].0, "duplicate children in cached listing");
    assert_eq!(anomalies[0].1.tags.get("folder_id").map(String::as_str), Some("10"));
}

#[tokio::test]
async fn test_refetch_when_listing_expired() {
    let h = setup().await;
    let mut folder = fresh(dir(10, 1, "Docs"));
    folder.response_at = chrono::Utc::now().timestamp() - 100 * 24 * 3600;
    cache_docs(&h, folder).await;
    assert_refetched(&h, FetchOptions::default()).await;
}

// ============================================================================
// Merge behavior
// ============================================================================

#[tokio::test]
async fn test_incomplete_folder_replaced_by_response_children() {
    let h = setup().await;
    let mut folder = fresh(dir(10, 1, "Docs"));
    folder.is_complete = false;
    cache_docs(&h, folder).await;

    h.api.listing(
        10,
        None,
        CursorPage::last(vec![file(12, 10, "b.txt"), file(13, 10, "c.txt")], LISTED_AT),
    );

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(ids(&contents.children), vec![12, 13]);
    assert!(contents.folder.is_complete);
    assert_eq!(child_ids(h.repo.as_ref(), 10).await, vec![12, 13]);
}

#[tokio::test]
async fn test_refetch_keeps_nested_children_and_offline_pin() {
    let h = setup().await;
    let mut folder = fresh(dir(10, 1, "Docs"));
    folder.is_complete = false;
    h.repo
        .upsert_folder(&folder, &[dir(20, 10, "C")], true)
        .await
        .unwrap();
    h.repo
        .upsert_folder(
            &fresh(dir(20, 10, "C")),
            &[file(21, 20, "x.txt"), file(22, 20, "y.txt")],
            true,
        )
        .await
        .unwrap();
    h.repo
        .update_in_place(id(20), Box::new(|f: &mut kdrive_core::domain::File| f.is_offline = true))
        .await;

    h.api.listing(
        10,
        None,
        CursorPage::last(vec![dir(20, 10, "C"), file(13, 10, "d.txt")], LISTED_AT),
    );

    h.provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    let c = h.repo.get_by_id(id(20)).await.unwrap().unwrap();
    assert!(c.is_offline);
    assert!(c.is_complete);
    assert_eq!(child_ids(h.repo.as_ref(), 20).await, vec![21, 22]);
}

#[tokio::test]
async fn test_local_changes_during_fetch_survive_the_merge() {
    let h = setup().await;
    let mut folder = fresh(dir(10, 1, "Docs"));
    folder.is_complete = false;
    cache_docs(&h, folder).await;
    script_docs_listing(&h);

    let repo = h.repo.clone();
    h.api.before_next_request(Box::new(move || -> BoxFuture<'static, ()> {
        Box::pin(async move {
            repo.update_in_place(
                id(10),
                Box::new(|f: &mut kdrive_core::domain::File| {
                    f.set_name("Renamed");
                    f.color = Some("red".into());
                    f.is_favorite = true;
                }),
            )
            .await;
        })
    }));

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert!(!contents.from_cache);
    assert_eq!(contents.folder.name, "Renamed");
    assert_eq!(contents.folder.color.as_deref(), Some("red"));
    assert!(contents.folder.is_favorite);
    assert!(contents.folder.is_complete);
    assert_eq!(contents.folder.response_at, LISTED_AT);

    let stored = h.repo.get_by_id(id(10)).await.unwrap().unwrap();
    assert_eq!(stored.name, "Renamed");
    assert_eq!(stored.color.as_deref(), Some("red"));
    assert_eq!(child_ids(h.repo.as_ref(), 10).await, vec![11, 12, 13]);
}

#[tokio::test]
async fn test_missing_response_at_reported() {
    let h = setup().await;
    h.api.detail(dir(10, 1, "Docs"));
    h.api
        .listing(10, None, CursorPage::last(vec![file(11, 10, "a.txt")], 0));

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(contents.folder.response_at, 0);
    let anomalies = h.reporter.anomalies.lock().unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].0, "listing returned no response_at");
}

// ============================================================================
// Fallbacks
// ============================================================================

#[tokio::test]
async fn test_first_page_failure_falls_back_to_stale_cache() {
    let h = setup().await;
    let mut folder = fresh(dir(10, 1, "Docs"));
    folder.is_complete = false;
    cache_docs(&h, folder).await;

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert!(contents.from_cache);
    assert!(!contents.folder.is_complete);
    assert_eq!(ids(&contents.children), vec![11, 12]);
    assert_eq!(h.api.calls(), vec!["files 10 None"]);
}

#[tokio::test]
async fn test_unknown_folder_yields_none() {
    let h = setup().await;

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap();

    assert!(contents.is_none());
    assert_eq!(h.api.calls(), vec!["details 10"]);
}

#[tokio::test]
async fn test_cache_only_never_calls_the_server() {
    let h = setup().await;
    let mut folder = fresh(dir(10, 1, "Docs"));
    folder.is_complete = false;
    cache_docs(&h, folder).await;

    let cached = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::cache_only())
        .await
        .unwrap()
        .unwrap();
    let missing = h
        .provider
        .get_folder_files(&h.user_drive, id(30), SortType::NameAz, FetchOptions::cache_only())
        .await
        .unwrap();

    assert!(cached.from_cache);
    assert_eq!(ids(&cached.children), vec![11, 12]);
    assert!(missing.is_none());
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn test_root_details_refetched_before_listing() {
    let h = setup().await;
    let mut root = dir(1, 0, "Private");
    root.is_complete = false;
    h.repo
        .upsert_folder(&root, &[dir(10, 1, "Docs")], true)
        .await
        .unwrap();

    h.api.detail(dir(1, 0, "My kDrive"));
    h.api
        .listing(1, None, CursorPage::last(vec![dir(10, 1, "Docs")], LISTED_AT));

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(1), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        h.api.calls(),
        vec![
            "details 1".to_string(),
            "files 1 None".to_string(),
            format!("activities 1 None Some({LISTED_AT})"),
        ]
    );
    assert_eq!(contents.folder.name, "My kDrive");
    assert!(contents.folder.is_complete);
}

#[tokio::test]
async fn test_unregistered_drive_is_an_error() {
    let h = setup().await;
    let other = UserDrive::new(UserId::new(99), DRIVE);

    let err = h
        .provider
        .get_folder_files(&other, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SyncError>(),
        Some(SyncError::StoreNotOpen(_))
    ));
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_full_first_page_leaves_cursor_for_next_page() {
    let h = setup().await;
    h.api.detail(dir(10, 1, "Docs"));
    script_two_pages(&h);

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert!(!contents.folder.is_complete);
    assert_eq!(contents.folder.cursor.as_deref(), Some("p2"));
    assert_eq!(ids(&contents.children), vec![11, 12, 13]);

    let page = h
        .provider
        .load_next_page(&h.user_drive, id(10), SortType::NameAz)
        .await
        .unwrap()
        .unwrap();
    assert!(!page.is_first);
    assert!(page.is_last);
    assert_eq!(ids(&page.files), vec![14]);

    let folder = h.repo.get_by_id(id(10)).await.unwrap().unwrap();
    assert!(folder.is_complete);
    assert_eq!(folder.cursor, None);
    assert_eq!(folder.response_at, LISTED_AT);
    assert_eq!(child_ids(h.repo.as_ref(), 10).await, vec![11, 12, 13, 14]);

    let after_last = h
        .provider
        .load_next_page(&h.user_drive, id(10), SortType::NameAz)
        .await
        .unwrap();
    assert!(after_last.is_none());
}

#[tokio::test]
async fn test_load_all_pages_streams_pages_then_catches_up() {
    let h = setup().await;
    h.api.detail(dir(10, 1, "Docs"));
    script_two_pages(&h);
    h.api
        .activity_page(None, CursorPage::last(vec![], LISTED_AT + 500));

    let (tx, mut rx) = mpsc::channel::<FolderPage>(8);
    let pages = h
        .provider
        .load_all_pages(&h.user_drive, id(10), SortType::NameAz, &CancellationToken::new(), tx)
        .await
        .unwrap();
    assert_eq!(pages, 2);

    let mut received = Vec::new();
    while let Some(page) = rx.recv().await {
        received.push(page);
    }
    assert_eq!(received.len(), 2);
    assert!(received[0].is_first && !received[0].is_last);
    assert_eq!(ids(&received[0].files), vec![11, 12, 13]);
    assert!(!received[1].is_first && received[1].is_last);
    assert_eq!(ids(&received[1].files), vec![14]);

    assert_eq!(
        h.api.calls(),
        vec![
            "details 10".to_string(),
            "files 10 None".to_string(),
            "files 10 Some(\"p2\")".to_string(),
            format!("activities 10 None Some({LISTED_AT})"),
        ]
    );
    let folder = h.repo.get_by_id(id(10)).await.unwrap().unwrap();
    assert!(folder.is_complete);
    assert_eq!(folder.response_at, LISTED_AT + 500);
}

#[tokio::test]
async fn test_single_page_load_catches_up() {
    let h = setup().await;
    h.api.detail(dir(10, 1, "Docs"));
    script_docs_listing(&h);
    h.api.activity_page(
        None,
        CursorPage::last(
            vec![activity(1, FileAction::FileTrash, 12, None, LISTED_AT + 10)],
            LISTED_AT + 500,
        ),
    );

    let (tx, _rx) = mpsc::channel::<FolderPage>(8);
    let pages = h
        .provider
        .load_all_pages(&h.user_drive, id(10), SortType::NameAz, &CancellationToken::new(), tx)
        .await
        .unwrap();

    assert_eq!(pages, 1);
    assert_eq!(
        h.api.calls_starting_with("activities"),
        vec![format!("activities 10 None Some({LISTED_AT})")]
    );
    assert_eq!(child_ids(h.repo.as_ref(), 10).await, vec![11, 13]);
    let folder = h.repo.get_by_id(id(10)).await.unwrap().unwrap();
    assert_eq!(folder.response_at, LISTED_AT + 500);
}

#[tokio::test]
async fn test_completed_fetch_catches_up_before_answering() {
    let h = setup().await;
    let mut folder = fresh(dir(10, 1, "Docs"));
    folder.is_complete = false;
    cache_docs(&h, folder).await;
    script_docs_listing(&h);
    h.api.activity_page(
        None,
        CursorPage::last(
            vec![activity(1, FileAction::FileCreate, 14, Some(file(14, 10, "d.txt")), LISTED_AT + 10)],
            LISTED_AT + 500,
        ),
    );

    let contents = h
        .provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(ids(&contents.children), vec![11, 12, 13, 14]);
    assert_eq!(contents.folder.response_at, LISTED_AT + 500);
}

#[tokio::test]
async fn test_incomplete_first_page_defers_catch_up() {
    let h = setup().await;
    h.api.detail(dir(10, 1, "Docs"));
    script_two_pages(&h);

    h.provider
        .get_folder_files(&h.user_drive, id(10), SortType::NameAz, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert!(h.api.calls_starting_with("activities").is_empty());

    h.provider
        .load_next_page(&h.user_drive, id(10), SortType::NameAz)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        h.api.calls_starting_with("activities"),
        vec![format!("activities 10 None Some({LISTED_AT})")]
    );
}

#[tokio::test]
async fn test_cancelled_load_stops_after_current_page() {
    let h = setup().await;
    h.api.detail(dir(10, 1, "Docs"));
    script_two_pages(&h);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (tx, _rx) = mpsc::channel::<FolderPage>(8);
    let pages = h
        .provider
        .load_all_pages(&h.user_drive, id(10), SortType::NameAz, &cancel, tx)
        .await
        .unwrap();

    assert_eq!(pages, 1);
    assert_eq!(h.api.calls_starting_with("files"), vec!["files 10 None"]);
    let folder = h.repo.get_by_id(id(10)).await.unwrap().unwrap();
    assert!(!folder.is_complete);
    assert_eq!(folder.cursor.as_deref(), Some("p2"));
}

#[tokio::test]
async fn test_next_page_failure_keeps_partial_listing() {
    let h = setup().await;
    h.api.detail(dir(10, 1, "Docs"));
    h.api.listing(
        10,
        None,
        CursorPage::with_more(
            vec![
                file(11, 10, "a.txt"),
                file(12, 10, "b.txt"),
                file(13, 10, "c.txt"),
            ],
            "p2",
            LISTED_AT,
        ),
    );

    let (tx, _rx) = mpsc::channel::<FolderPage>(8);
    let pages = h
        .provider
        .load_all_pages(&h.user_drive, id(10), SortType::NameAz, &CancellationToken::new(), tx)
        .await
        .unwrap();

    assert_eq!(pages, 1);
    assert_eq!(child_ids(h.repo.as_ref(), 10).await, vec![11, 12, 13]);
    assert!(h.api.calls_starting_with("activities").is_empty());
}

#[tokio::test]
async fn test_first_page_failure_fails_load_all_pages() {
    let h = setup().await;
    h.api.detail(dir(10, 1, "Docs"));

    let (tx, _rx) = mpsc::channel::<FolderPage>(8);
    let result = h
        .provider
        .load_all_pages(&h.user_drive, id(10), SortType::NameAz, &CancellationToken::new(), tx)
        .await;

    assert!(result.is_err());
}

// ============================================================================
// Special folders
// ============================================================================

#[tokio::test]
async fn test_special_folder_loaded_into_container() {
    let h = setup().await;
    h.repo
        .insert_child(SpecialFolder::Favorites.id(), &file(99, 10, "old.txt"))
        .await
        .unwrap();

    h.api.special(
        SpecialFolder::Favorites,
        None,
        CursorPage::with_more(vec![file(11, 10, "a.txt")], "s2", LISTED_AT),
    );
    h.api.special(
        SpecialFolder::Favorites,
        Some("s2"),
        CursorPage::last(vec![file(42, 30, "b.txt")], LISTED_AT + 1),
    );

    let (tx, mut rx) = mpsc::channel::<FolderPage>(8);
    let pages = h
        .provider
        .load_special_folder(
            &h.user_drive,
            SpecialFolder::Favorites,
            SortType::NameAz,
            &CancellationToken::new(),
            tx,
        )
        .await
        .unwrap();
    assert_eq!(pages, 2);

    let first = rx.recv().await.unwrap();
    assert_eq!(first.folder_id, SpecialFolder::Favorites.id());
    assert!(first.is_first);

    let favorites = h
        .provider
        .get_special_folder(&h.user_drive, SpecialFolder::Favorites, SortType::NameAz)
        .await
        .unwrap();
    assert_eq!(ids(&favorites), vec![11, 42]);

    let container = h
        .repo
        .get_by_id(SpecialFolder::Favorites.id())
        .await
        .unwrap()
        .unwrap();
    assert!(container.is_complete);
    assert_eq!(container.response_at, LISTED_AT);

    // Real parents are untouched by the container links
    let node = h.repo.get_by_id(id(42)).await.unwrap().unwrap();
    assert_eq!(node.parent_id, id(30));
}

#[tokio::test]
async fn test_special_folder_first_page_failure() {
    let h = setup().await;

    let (tx, _rx) = mpsc::channel::<FolderPage>(8);
    let result = h
        .provider
        .load_special_folder(
            &h.user_drive,
            SpecialFolder::Gallery,
            SortType::RecentDate,
            &CancellationToken::new(),
            tx,
        )
        .await;

    assert!(result.is_err());
    assert!(h
        .repo
        .get_by_id(SpecialFolder::Gallery.id())
        .await
        .unwrap()
        .is_none());
}
