#![allow(clippy::unwrap_used, clippy::expect_used)]

use artipub_core::errors::{ExError, ExErrorKind};
use artipub_core::model::{ArtifactName, ArtifactSet};
use artipub_core_types::RunId;

#[test]
fn test_display_includes_context() {
    let err = ExError::new(ExErrorKind::MissingBlob)
        .with_op("snapshot_at")
        .with_entity_id("a.json")
        .with_revision(4)
        .with_message("blob absent from CAS");
    assert_eq!(
        err.to_string(),
        "[ERR_MISSING_BLOB] in operation 'snapshot_at': blob absent from CAS (entity_id: a.json) (revision: 4)"
    );
}

#[test]
fn test_display_includes_source_chain() {
    let inner = ExError::new(ExErrorKind::Io).with_message("disk full");
    let outer = ExError::new(ExErrorKind::StoreUnavailable)
        .with_op("commit")
        .with_source(inner);
    assert_eq!(
        outer.to_string(),
        "[ERR_STORE_UNAVAILABLE] in operation 'commit'; caused by [ERR_IO]: disk full"
    );
    let source = std::error::Error::source(&outer).unwrap();
    assert_eq!(source.to_string(), "[ERR_IO]: disk full");
}

#[test]
fn test_run_id_context() {
    let run_id = RunId::from_string("run-42");
    let err = ExError::new(ExErrorKind::GeneratorTimeout).with_run_id(run_id.clone());
    assert_eq!(err.run_id(), Some(&run_id));
}

#[test]
fn test_invalid_names_map_to_invalid_artifact_name() {
    for bad in ["", "/abs", "a//b", "a/./b", "../x", "a\\b", "nul\0"] {
        let err: ExError = ArtifactName::new(bad).unwrap_err().into();
        assert_eq!(err.kind(), ExErrorKind::InvalidArtifactName, "name {bad:?}");
    }
}

#[test]
fn test_duplicate_insert_maps_to_duplicate_artifact() {
    let mut set = ArtifactSet::new();
    set.insert("a.json", "1").unwrap();
    let err: ExError = set.insert("a.json", "2").unwrap_err().into();
    assert_eq!(err.kind(), ExErrorKind::DuplicateArtifact);
    assert_eq!(err.entity_id(), Some("a.json"));
    assert_eq!(set.get("a.json"), Some(&b"1"[..]));
}
