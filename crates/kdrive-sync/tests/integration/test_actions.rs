//! Write-through mutations

use futures::future::BoxFuture;
use kdrive_core::domain::{File, SpecialFolder};
use kdrive_core::ports::IFileRepository;

use crate::common::*;

/// Root 1 > Docs 10 > Sub 20 > x.txt 21
async fn cache_tree(h: &Harness) {
    h.repo
        .upsert_folder(&dir(1, 0, "Root"), &[dir(10, 1, "Docs")], true)
        .await
        .unwrap();
    h.repo
        .upsert_folder(&dir(10, 1, "Docs"), &[dir(20, 10, "Sub")], true)
        .await
        .unwrap();
    h.repo
        .upsert_folder(&dir(20, 10, "Sub"), &[file(21, 20, "x.txt")], true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rename_invalidates_subtree_paths() {
    let h = setup().await;
    cache_tree(&h).await;
    assert_eq!(
        h.repo.get_path(id(21)).await.unwrap().as_deref(),
        Some("/Docs/Sub/x.txt")
    );
    assert_eq!(h.repo.get_path(id(20)).await.unwrap().as_deref(), Some("/Docs/Sub"));

    h.actions
        .rename(&h.user_drive, id(10), "Papers")
        .await
        .unwrap();

    assert_eq!(h.api.calls(), vec!["rename 10 Papers"]);
    assert_eq!(h.repo.get_by_id(id(10)).await.unwrap().unwrap().name, "Papers");
    assert_eq!(h.repo.get_by_id(id(20)).await.unwrap().unwrap().path, None);
    assert_eq!(h.repo.get_by_id(id(21)).await.unwrap().unwrap().path, None);
    assert_eq!(
        h.repo.get_path(id(21)).await.unwrap().as_deref(),
        Some("/Papers/Sub/x.txt")
    );
}

#[tokio::test]
async fn test_rename_keeps_local_changes_made_meanwhile() {
    let h = setup().await;
    cache_tree(&h).await;

    let repo = h.repo.clone();
    h.api.before_next_request(Box::new(move || -> BoxFuture<'static, ()> {
        Box::pin(async move {
            repo.update_in_place(id(10), Box::new(|f: &mut File| f.color = Some("red".into())))
                .await;
        })
    }));

    h.actions
        .rename(&h.user_drive, id(10), "Papers")
        .await
        .unwrap();

    let folder = h.repo.get_by_id(id(10)).await.unwrap().unwrap();
    assert_eq!(folder.name, "Papers");
    assert_eq!(folder.color.as_deref(), Some("red"));
}

#[tokio::test]
async fn test_favorite_keeps_local_changes_made_meanwhile() {
    let h = setup().await;
    cache_tree(&h).await;

    let repo = h.repo.clone();
    h.api.before_next_request(Box::new(move || -> BoxFuture<'static, ()> {
        Box::pin(async move {
            repo.update_in_place(id(21), Box::new(|f: &mut File| f.set_name("y.txt")))
                .await;
        })
    }));

    h.actions.add_favorite(&h.user_drive, id(21)).await.unwrap();

    let node = h.repo.get_by_id(id(21)).await.unwrap().unwrap();
    assert_eq!(node.name, "y.txt");
    assert!(node.is_favorite);
}

#[tokio::test]
async fn test_rejected_rename_leaves_mirror_untouched() {
    let h = setup().await;
    cache_tree(&h).await;
    h.repo.get_path(id(21)).await.unwrap();
    h.api.reject_mutations();

    let result = h.actions.rename(&h.user_drive, id(10), "Papers").await;

    assert!(result.is_err());
    assert_eq!(h.repo.get_by_id(id(10)).await.unwrap().unwrap().name, "Docs");
    assert_eq!(
        h.repo.get_by_id(id(21)).await.unwrap().unwrap().path.as_deref(),
        Some("/Docs/Sub/x.txt")
    );
}

#[tokio::test]
async fn test_trash_removes_cached_subtree() {
    let h = setup().await;
    cache_tree(&h).await;

    h.actions.trash(&h.user_drive, id(20)).await.unwrap();

    assert_eq!(h.api.calls(), vec!["trash 20"]);
    assert!(h.repo.get_by_id(id(20)).await.unwrap().is_none());
    assert!(h.repo.get_by_id(id(21)).await.unwrap().is_none());
    assert!(child_ids(h.repo.as_ref(), 10).await.is_empty());
}

#[tokio::test]
async fn test_update_color() {
    let h = setup().await;
    cache_tree(&h).await;

    h.actions
        .update_color(&h.user_drive, id(20), "#e91e63")
        .await
        .unwrap();

    let folder = h.repo.get_by_id(id(20)).await.unwrap().unwrap();
    assert_eq!(folder.color.as_deref(), Some("#e91e63"));
}

#[tokio::test]
async fn test_favorite_links_into_container() {
    let h = setup().await;
    cache_tree(&h).await;
    let favorites = SpecialFolder::Favorites.id();

    h.actions.add_favorite(&h.user_drive, id(21)).await.unwrap();

    let node = h.repo.get_by_id(id(21)).await.unwrap().unwrap();
    assert!(node.is_favorite);
    assert!(h.repo.get_by_id(favorites).await.unwrap().is_some());
    assert_eq!(child_ids(h.repo.as_ref(), favorites.get()).await, vec![21]);
    assert_eq!(child_ids(h.repo.as_ref(), 20).await, vec![21]);
    assert_eq!(
        h.repo.get_parent(id(21)).await.unwrap().map(|p| p.id),
        Some(id(20))
    );

    h.actions
        .remove_favorite(&h.user_drive, id(21))
        .await
        .unwrap();

    assert!(!h.repo.get_by_id(id(21)).await.unwrap().unwrap().is_favorite);
    assert!(child_ids(h.repo.as_ref(), favorites.get()).await.is_empty());
    assert_eq!(h.api.calls(), vec!["favorite+ 21", "favorite- 21"]);
}

#[tokio::test]
async fn test_favorite_of_uncached_node_only_calls_server() {
    let h = setup().await;

    h.actions.add_favorite(&h.user_drive, id(999)).await.unwrap();

    assert_eq!(h.api.calls(), vec!["favorite+ 999"]);
    assert!(h
        .repo
        .get_by_id(SpecialFolder::Favorites.id())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_dropbox_lifecycle() {
    let h = setup().await;
    cache_tree(&h).await;

    let dropbox = h.actions.create_dropbox(&h.user_drive, id(20)).await.unwrap();
    assert_eq!(dropbox.id, 500);
    let stored = h.repo.get_by_id(id(20)).await.unwrap().unwrap();
    assert_eq!(stored.dropbox, Some(dropbox));

    h.actions.delete_dropbox(&h.user_drive, id(20)).await.unwrap();
    assert_eq!(h.repo.get_by_id(id(20)).await.unwrap().unwrap().dropbox, None);
}

#[tokio::test]
async fn test_offline_pin_is_local_only() {
    let h = setup().await;
    cache_tree(&h).await;

    h.actions
        .set_offline(&h.user_drive, id(21), true)
        .await
        .unwrap();

    assert!(h.repo.get_by_id(id(21)).await.unwrap().unwrap().is_offline);
    assert!(h.api.calls().is_empty());
}
