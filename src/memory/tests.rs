//! Behavioural tests for the in-memory file store.

use std::time::Duration;

use rstest::rstest;

use super::ranges::RangeSet;
use crate::store::{
    ByteRange, CopyStatus, DirectoryRef, FileRef, FileStore, Metadata, ResourceKind,
    ServicePropertiesUpdate, ShareOptions, ShareRef, StoreError, wait_for_copy,
};
use crate::test_support::memory_store;

fn options_with(metadata: Metadata, quota_gb: Option<u32>) -> ShareOptions {
    ShareOptions {
        metadata,
        quota_gb,
    }
}

async fn share_with_directory(store: &super::MemoryStore) -> (ShareRef, DirectoryRef) {
    let share = store
        .create_share("myshare", &ShareOptions::default())
        .await
        .expect("share should create");
    let directory = store
        .create_directory(&share, "mydirectory", &Metadata::new())
        .await
        .expect("directory should create");
    (share, directory)
}

#[tokio::test]
async fn shares_round_trip_metadata_and_quota() {
    let store = memory_store();
    let metadata = Metadata::from_pairs([("foo", "bar"), ("baz", "foo")]);
    let share = store
        .create_share("myshare", &options_with(metadata.clone(), Some(1)))
        .await
        .expect("share should create");

    let properties = store
        .share_properties(&share)
        .await
        .expect("properties should load");
    assert_eq!(properties.metadata, metadata);
    assert_eq!(properties.quota_gb, Some(1));
    assert!(store.share_exists("myshare").await.expect("exists check"));
}

#[tokio::test]
async fn duplicate_share_creation_is_rejected() {
    let store = memory_store();
    store
        .create_share("myshare", &ShareOptions::default())
        .await
        .expect("first create should pass");
    let err = store
        .create_share("myshare", &ShareOptions::default())
        .await
        .expect_err("second create should fail");
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
}

#[tokio::test]
async fn deleting_a_missing_share_reports_not_found() {
    let store = memory_store();
    let err = store
        .delete_share(&ShareRef::new("nothere"))
        .await
        .expect_err("delete should fail");
    assert_eq!(err, StoreError::not_found(ResourceKind::Share, "nothere"));
}

#[tokio::test]
async fn share_listing_honours_the_prefix() {
    let store = memory_store();
    for name in ["samplea", "sampleb", "other"] {
        store
            .create_share(name, &ShareOptions::default())
            .await
            .expect("share should create");
    }

    let matched: Vec<String> = store
        .list_shares(Some("sample"))
        .await
        .expect("listing should pass")
        .collect();
    assert_eq!(matched, vec!["samplea".to_owned(), "sampleb".to_owned()]);

    let all: Vec<String> = store
        .list_shares(None)
        .await
        .expect("listing should pass")
        .collect();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn directories_carry_metadata_and_cascade_on_delete() {
    let store = memory_store();
    let share = store
        .create_share("myshare", &ShareOptions::default())
        .await
        .expect("share should create");
    let metadata = Metadata::from_pairs([("abc", "def"), ("jkl", "mno")]);
    let directory = store
        .create_directory(&share, "mydirectory", &metadata)
        .await
        .expect("directory should create");

    let properties = store
        .directory_properties(&directory)
        .await
        .expect("properties should load");
    assert_eq!(properties.metadata, metadata);

    let file = FileRef::in_directory(&directory, "sample.txt");
    store
        .upload_file(&file, b"Hello world!", &Metadata::new())
        .await
        .expect("upload should pass");
    store
        .delete_directory(&directory)
        .await
        .expect("delete should pass");

    let err = store
        .download_file(&file)
        .await
        .expect_err("file should be gone with its directory");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn uploads_round_trip_content_and_metadata() {
    let store = memory_store();
    let (_, directory) = share_with_directory(&store).await;
    let file = FileRef::in_directory(&directory, "sample.txt");
    let metadata = Metadata::from_pairs([("prop1", "val1"), ("prop2", "val2")]);

    store
        .upload_file(&file, b"Hello World! - from text sample", &metadata)
        .await
        .expect("upload should pass");

    let content = store.download_file(&file).await.expect("download");
    assert_eq!(content, b"Hello World! - from text sample");

    let properties = store.file_properties(&file).await.expect("properties");
    assert_eq!(properties.length, 31);
    assert_eq!(properties.metadata, metadata);
}

#[tokio::test]
async fn listing_children_mixes_directories_and_root_files() {
    let store = memory_store();
    let (share, directory) = share_with_directory(&store).await;
    let root_file = FileRef::in_share_root(&share, "root.txt");
    let nested_file = FileRef::in_directory(&directory, "nested.txt");
    store
        .upload_file(&root_file, b"a", &Metadata::new())
        .await
        .expect("upload should pass");
    store
        .upload_file(&nested_file, b"b", &Metadata::new())
        .await
        .expect("upload should pass");

    let top: Vec<String> = store
        .list_children(&share, None)
        .await
        .expect("listing should pass")
        .collect();
    assert_eq!(top, vec!["mydirectory".to_owned(), "root.txt".to_owned()]);

    let nested: Vec<String> = store
        .list_children(&share, Some("mydirectory"))
        .await
        .expect("listing should pass")
        .collect();
    assert_eq!(nested, vec!["nested.txt".to_owned()]);
}

#[tokio::test]
async fn allocated_files_report_no_written_ranges() {
    let store = memory_store();
    let (share, _) = share_with_directory(&store).await;
    let file = FileRef::in_share_root(&share, "sparse.bin");
    store
        .create_file(&file, 1024, &Metadata::new())
        .await
        .expect("create should pass");

    let content = store.download_file(&file).await.expect("download");
    assert_eq!(content.len(), 1024);
    assert!(content.iter().all(|byte| *byte == 0));
    let ranges = store.list_ranges(&file).await.expect("ranges");
    assert!(ranges.is_empty());
}

#[tokio::test]
async fn range_writes_land_and_coalesce() {
    let store = memory_store();
    let (share, _) = share_with_directory(&store).await;
    let file = FileRef::in_share_root(&share, "data.bin");
    store
        .upload_file(&file, b"Hello world!", &Metadata::new())
        .await
        .expect("upload should pass");

    store
        .write_range(&file, 0, b"abcdefghijkl")
        .await
        .expect("range write should pass");

    let content = store.download_file(&file).await.expect("download");
    assert_eq!(content, b"abcdefghijkl");
    let ranges = store.list_ranges(&file).await.expect("ranges");
    assert_eq!(ranges, vec![ByteRange::new(0, 11)]);
}

#[tokio::test]
async fn range_writes_outside_the_file_are_rejected() {
    let store = memory_store();
    let (share, _) = share_with_directory(&store).await;
    let file = FileRef::in_share_root(&share, "data.bin");
    store
        .create_file(&file, 8, &Metadata::new())
        .await
        .expect("create should pass");

    let err = store
        .write_range(&file, 4, b"toolong")
        .await
        .expect_err("write past the end should fail");
    assert!(matches!(err, StoreError::RangeOutOfBounds { .. }));

    let empty = store
        .write_range(&file, 0, b"")
        .await
        .expect_err("empty writes should fail");
    assert!(matches!(empty, StoreError::Validation(_)));
}

#[tokio::test]
async fn quota_rejects_files_that_do_not_fit() {
    let store = memory_store();
    let share = store
        .create_share("tight", &options_with(Metadata::new(), Some(1)))
        .await
        .expect("share should create");
    let file = FileRef::in_share_root(&share, "huge.bin");

    let err = store
        .create_file(&file, 2 * super::BYTES_PER_GIB, &Metadata::new())
        .await
        .expect_err("allocation should exceed the quota");
    let StoreError::QuotaExceeded { share: name, quota_gb, .. } = err else {
        panic!("expected QuotaExceeded, got {err:?}");
    };
    assert_eq!(name, "tight");
    assert_eq!(quota_gb, 1);
}

#[tokio::test]
async fn copies_resolve_urls_within_the_account() {
    let store = memory_store();
    let (share, directory) = share_with_directory(&store).await;
    let source = FileRef::in_directory(&directory, "source.txt");
    store
        .upload_file(&source, b"Hello world!", &Metadata::new())
        .await
        .expect("upload should pass");

    let destination = FileRef::in_share_root(&share, "copy.txt");
    let state = store
        .copy_file_from_url(&destination, &store.file_url(&source))
        .await
        .expect("copy should start");
    assert_eq!(state.status, CopyStatus::Success);

    let content = store.download_file(&destination).await.expect("download");
    assert_eq!(content, b"Hello world!");
}

#[tokio::test]
async fn copies_from_foreign_urls_are_rejected() {
    let store = memory_store();
    let (share, _) = share_with_directory(&store).await;
    let destination = FileRef::in_share_root(&share, "copy.txt");
    let err = store
        .copy_file_from_url(&destination, "https://elsewhere.example/share/file")
        .await
        .expect_err("foreign source should be rejected");
    assert!(matches!(err, StoreError::BadCopySource { .. }));
}

#[tokio::test]
async fn deferred_copies_stay_pending_until_completed() {
    let store = memory_store().with_deferred_copies();
    let (share, _) = share_with_directory(&store).await;
    let source = FileRef::in_share_root(&share, "source.txt");
    store
        .upload_file(&source, b"Hello world!", &Metadata::new())
        .await
        .expect("upload should pass");

    let destination = FileRef::in_share_root(&share, "copy.txt");
    let state = store
        .copy_file_from_url(&destination, &store.file_url(&source))
        .await
        .expect("copy should start");
    assert_eq!(state.status, CopyStatus::Pending);

    assert_eq!(store.complete_pending_copies(), 1);
    let status = wait_for_copy(
        &store,
        &destination,
        Duration::from_millis(1),
        Duration::from_secs(1),
    )
    .await
    .expect("copy should settle");
    assert_eq!(status, CopyStatus::Success);

    let content = store.download_file(&destination).await.expect("download");
    assert_eq!(content, b"Hello world!");
}

#[tokio::test]
async fn aborting_a_pending_copy_discards_the_transfer() {
    let store = memory_store().with_deferred_copies();
    let (share, _) = share_with_directory(&store).await;
    let source = FileRef::in_share_root(&share, "source.txt");
    store
        .upload_file(&source, b"Hello world!", &Metadata::new())
        .await
        .expect("upload should pass");

    let destination = FileRef::in_share_root(&share, "copy.txt");
    let state = store
        .copy_file_from_url(&destination, &store.file_url(&source))
        .await
        .expect("copy should start");

    store
        .abort_copy(&destination, &state.id)
        .await
        .expect("abort should pass");

    let properties = store
        .file_properties(&destination)
        .await
        .expect("properties");
    let copy = properties.copy.expect("copy state should be recorded");
    assert_eq!(copy.status, CopyStatus::Aborted);
    assert_eq!(properties.length, 0);

    let err = store
        .abort_copy(&destination, &state.id)
        .await
        .expect_err("second abort should fail");
    assert!(matches!(err, StoreError::NoPendingCopy { .. }));
}

#[tokio::test]
async fn service_properties_apply_partial_updates() {
    let store = memory_store();
    let initial = store.service_properties().await.expect("properties");
    assert!(initial.cors.is_empty());

    let rule = crate::store::CorsRule {
        allowed_origins: vec!["*".to_owned()],
        allowed_methods: vec!["POST".to_owned(), "GET".to_owned()],
        allowed_headers: vec!["*".to_owned()],
        exposed_headers: vec!["*".to_owned()],
        max_age_secs: 3600,
    };
    store
        .set_service_properties(&ServicePropertiesUpdate::new().with_cors(vec![rule.clone()]))
        .await
        .expect("update should pass");

    let updated = store.service_properties().await.expect("properties");
    assert_eq!(updated.cors, vec![rule]);
    assert_eq!(updated.hour_metrics, initial.hour_metrics);
}

#[rstest]
#[case(&[(0, 3), (8, 11)], &[(0, 3), (8, 11)])]
#[case(&[(0, 3), (4, 7)], &[(0, 7)])]
#[case(&[(0, 5), (3, 9)], &[(0, 9)])]
#[case(&[(8, 11), (0, 3), (2, 9)], &[(0, 11)])]
fn range_sets_merge_touching_spans(
    #[case] inserts: &[(u64, u64)],
    #[case] expected: &[(u64, u64)],
) {
    let mut set = RangeSet::default();
    for (start, end) in inserts {
        set.insert(*start, *end);
    }
    let spans: Vec<(u64, u64)> = set
        .as_ranges()
        .into_iter()
        .map(|range| (range.start, range.end))
        .collect();
    assert_eq!(spans, expected);
}
