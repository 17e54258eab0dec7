//! DiffEngine behaviour: worked examples and properties.
//!
//! Everything here operates on in-memory artifact sets (no I/O).

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use artipub_core::diff::{compute_diff, ChangeKind};
use artipub_core::model::ArtifactSet;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn set(pairs: &[(&str, &str)]) -> ArtifactSet {
    ArtifactSet::from_pairs(pairs.iter().copied()).unwrap()
}

fn kinds(old: &ArtifactSet, new: &ArtifactSet) -> Vec<(String, ChangeKind)> {
    compute_diff(old, new)
        .iter()
        .map(|r| (r.name.to_string(), r.kind))
        .collect()
}

// ---------------------------------------------------------------------------
// Worked examples
// ---------------------------------------------------------------------------

#[test]
fn test_unchanged_content_yields_no_records() {
    let old = set(&[("a.json", "1")]);
    let new = set(&[("a.json", "1")]);
    assert!(compute_diff(&old, &new).is_empty());
}

#[test]
fn test_changed_content_is_modified() {
    let old = set(&[("a.json", "1")]);
    let new = set(&[("a.json", "2")]);
    assert_eq!(
        kinds(&old, &new),
        vec![("a.json".to_string(), ChangeKind::Modified)]
    );
}

#[test]
fn test_new_artifact_is_added() {
    let old = set(&[("a.json", "1")]);
    let new = set(&[("a.json", "1"), ("b.json", "x")]);
    let diff = compute_diff(&old, &new);
    assert_eq!(
        kinds(&old, &new),
        vec![("b.json".to_string(), ChangeKind::Added)]
    );
    assert_eq!(diff.records()[0].old_content, None);
    assert_eq!(diff.records()[0].new_content.as_deref(), Some(&b"x"[..]));
}

#[test]
fn test_missing_artifact_is_removed() {
    let old = set(&[("a.json", "1"), ("b.json", "2")]);
    let new = set(&[("a.json", "1")]);
    let diff = compute_diff(&old, &new);
    assert_eq!(
        kinds(&old, &new),
        vec![("b.json".to_string(), ChangeKind::Removed)]
    );
    assert_eq!(diff.records()[0].old_content.as_deref(), Some(&b"2"[..]));
}

#[test]
fn test_both_empty() {
    assert!(compute_diff(&ArtifactSet::new(), &ArtifactSet::new()).is_empty());
}

#[test]
fn test_everything_removed() {
    let old = set(&[("a", "1"), ("b", "2")]);
    let diff = compute_diff(&old, &ArtifactSet::new());
    assert_eq!(diff.counts().removed, 2);
}

#[test]
fn test_nested_names_sort_bytewise() {
    let old = ArtifactSet::new();
    let new = set(&[("z.json", ""), ("a/b.json", ""), ("a.json", "")]);
    let names: Vec<_> = compute_diff(&old, &new)
        .iter()
        .map(|r| r.name.to_string())
        .collect();
    assert_eq!(names, vec!["a.json", "a/b.json", "z.json"]);
}

#[test]
fn test_change_set_json_shape() {
    let old = set(&[("a.json", "1")]);
    let new = set(&[("a.json", "2")]);
    let json = serde_json::to_value(compute_diff(&old, &new)).unwrap();
    assert_eq!(json["records"][0]["name"], "a.json");
    assert_eq!(json["records"][0]["kind"], "MODIFIED");
    assert_eq!(json["records"][0]["old_content"], "MQ==");
    assert_eq!(json["records"][0]["new_content"], "Mg==");
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn artifact_set() -> impl Strategy<Value = ArtifactSet> {
    prop::collection::btree_map(
        "[a-d]{1,3}(/[a-d]{1,3})?",
        prop::collection::vec(any::<u8>(), 0..16),
        0..8,
    )
    .prop_map(|entries: BTreeMap<String, Vec<u8>>| ArtifactSet::from_pairs(entries).unwrap())
}

proptest! {
    #[test]
    fn prop_diff_with_self_is_empty(a in artifact_set()) {
        prop_assert!(compute_diff(&a, &a).is_empty());
    }

    #[test]
    fn prop_diff_is_deterministic(a in artifact_set(), b in artifact_set()) {
        prop_assert_eq!(compute_diff(&a, &b), compute_diff(&a, &b));
    }

    #[test]
    fn prop_records_sorted_and_unique(a in artifact_set(), b in artifact_set()) {
        let diff = compute_diff(&a, &b);
        let names: Vec<_> = diff.iter().map(|r| r.name.clone()).collect();
        prop_assert!(names.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_records_match_membership(a in artifact_set(), b in artifact_set()) {
        for record in &compute_diff(&a, &b) {
            let name = record.name.as_str();
            match record.kind {
                ChangeKind::Added => prop_assert!(!a.contains(name) && b.contains(name)),
                ChangeKind::Removed => prop_assert!(a.contains(name) && !b.contains(name)),
                ChangeKind::Modified => prop_assert!(a.get(name) != b.get(name)),
            }
        }
    }

    #[test]
    fn prop_diff_is_antisymmetric(a in artifact_set(), b in artifact_set()) {
        let forward = compute_diff(&a, &b).counts();
        let backward = compute_diff(&b, &a).counts();
        prop_assert_eq!(forward.added, backward.removed);
        prop_assert_eq!(forward.removed, backward.added);
        prop_assert_eq!(forward.modified, backward.modified);
    }
}
