//! Unit tests for the store data model and naming rules.

use super::*;
use rstest::rstest;

#[rstest]
#[case("s1")]
#[case("abc")]
#[case("share-01")]
#[case("a2c-x9")]
fn share_names_within_the_rules_pass(#[case] name: &str) {
    validate_share_name(name).expect("name should be accepted");
}

#[rstest]
#[case("", "1 to 63")]
#[case("UpperCase", "lowercase")]
#[case("has_underscore", "lowercase")]
#[case("-leading", "start and end")]
#[case("trailing-", "start and end")]
#[case("double--hyphen", "consecutive")]
fn share_names_outside_the_rules_are_rejected(#[case] name: &str, #[case] fragment: &str) {
    let err = validate_share_name(name).expect_err("name should be rejected");
    let StoreError::InvalidName { rule, .. } = err else {
        panic!("expected InvalidName, got {err:?}");
    };
    assert!(
        rule.contains(fragment),
        "expected rule mentioning '{fragment}', got: {rule}"
    );
}

#[rstest]
fn overlong_share_names_are_rejected() {
    let name = "a".repeat(64);
    let err = validate_share_name(&name).expect_err("name should be rejected");
    let StoreError::InvalidName { rule, .. } = err else {
        panic!("expected InvalidName, got {err:?}");
    };
    assert!(rule.contains("1 to 63"), "got: {rule}");
}

#[rstest]
#[case("sample.txt")]
#[case("mydirectory")]
#[case("UPPER and spaces ok")]
fn component_names_within_the_rules_pass(#[case] name: &str) {
    validate_component_name(name).expect("name should be accepted");
}

#[rstest]
#[case("")]
#[case("a/b")]
#[case("a\\b")]
#[case(".")]
#[case("..")]
fn component_names_outside_the_rules_are_rejected(#[case] name: &str) {
    validate_component_name(name).expect_err("name should be rejected");
}

#[rstest]
fn unique_names_keep_the_prefix_and_differ() {
    let first = unique_name("sharesample");
    let second = unique_name("sharesample");
    assert!(first.starts_with("sharesample"));
    assert_ne!(first, second);
    validate_share_name(&first).expect("generated share names should be valid");
}

#[rstest]
fn metadata_round_trips_pairs_in_key_order() {
    let metadata = Metadata::from_pairs([("foo", "bar"), ("baz", "foo")]);
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata.get("foo"), Some("bar"));
    assert_eq!(metadata.get("baz"), Some("foo"));
    let keys: Vec<&str> = metadata.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["baz", "foo"]);
}

#[rstest]
#[case("9starts-with-digit")]
#[case("has-hyphen")]
#[case("")]
fn metadata_rejects_non_identifier_keys(#[case] key: &str) {
    let metadata = Metadata::from_pairs([(key, "value")]);
    let err = metadata.validate().expect_err("key should be rejected");
    assert!(matches!(err, StoreError::InvalidName { .. }));
}

#[rstest]
fn metadata_rejects_oversized_maps() {
    let mut metadata = Metadata::new();
    metadata.insert("big", "x".repeat(METADATA_MAX_BYTES));
    let err = metadata.validate().expect_err("map should be rejected");
    assert!(matches!(err, StoreError::Validation(_)));
}

#[rstest]
fn share_options_builder_carries_metadata_and_quota() {
    let options = ShareOptions::builder()
        .metadata(Metadata::from_pairs([("abc", "def")]))
        .quota_gb(1)
        .build()
        .expect("options should build");
    assert_eq!(options.quota_gb, Some(1));
    assert_eq!(options.metadata.get("abc"), Some("def"));
}

#[rstest]
#[case(0)]
#[case(MAX_SHARE_QUOTA_GB + 1)]
fn share_options_builder_rejects_out_of_range_quota(#[case] quota_gb: u32) {
    let err = ShareOptions::builder()
        .quota_gb(quota_gb)
        .build()
        .expect_err("quota should be rejected");
    assert!(matches!(err, StoreError::Validation(_)));
}

#[rstest]
fn byte_ranges_report_inclusive_lengths() {
    let range = ByteRange::new(0, 11);
    assert_eq!(range.len(), 12);
    assert!(!range.is_empty());
    assert_eq!(range.to_string(), "0-11");
}

#[rstest]
#[case(CopyStatus::Pending, false, "pending")]
#[case(CopyStatus::Success, true, "success")]
#[case(CopyStatus::Failed, true, "failed")]
#[case(CopyStatus::Aborted, true, "aborted")]
fn copy_statuses_classify_and_render(
    #[case] status: CopyStatus,
    #[case] terminal: bool,
    #[case] label: &str,
) {
    assert_eq!(status.is_terminal(), terminal);
    assert_eq!(status.to_string(), label);
}

#[rstest]
fn name_lists_are_single_pass() {
    let mut list = NameList::from_names(["a".to_owned(), "b".to_owned()]);
    assert_eq!(list.next(), Some("a".to_owned()));
    assert_eq!(list.next(), Some("b".to_owned()));
    assert_eq!(list.next(), None);
    assert_eq!(list.next(), None);
}

#[rstest]
fn file_refs_render_account_relative_paths() {
    let share = ShareRef::new("myshare");
    let directory = DirectoryRef::new(&share, "mydirectory");
    let nested = FileRef::in_directory(&directory, "sample.txt");
    let root = FileRef::in_share_root(&share, "sample.txt");
    assert_eq!(directory.full_path(), "myshare/mydirectory");
    assert_eq!(nested.full_path(), "myshare/mydirectory/sample.txt");
    assert_eq!(root.full_path(), "myshare/sample.txt");
}

#[rstest]
fn service_property_updates_start_empty() {
    let update = ServicePropertiesUpdate::new();
    assert_eq!(update, ServicePropertiesUpdate::default());
    let update_with_rules = update.with_cors(Vec::new());
    assert_eq!(update_with_rules.cors, Some(Vec::new()));
    assert_eq!(update_with_rules.hour_metrics, None);
}

#[rstest]
fn not_found_errors_classify_as_already_gone() {
    let missing = StoreError::not_found(ResourceKind::Share, "myshare");
    assert!(missing.is_not_found());
    let clash = StoreError::already_exists(ResourceKind::File, "myshare/sample.txt");
    assert!(!clash.is_not_found());
}
