//! Merge-walk diff over two artifact sets.

use std::cmp::Ordering;

use crate::diff::model::{ChangeRecord, ChangeSet};
use crate::model::ArtifactSet;

/// Compare `old` against `new` and return the per-artifact changes.
///
/// Both sets iterate in name order, so a single merge pass yields records
/// already sorted by name. Contents are compared as raw bytes.
pub fn compute_diff(old: &ArtifactSet, new: &ArtifactSet) -> ChangeSet {
    let mut records = Vec::new();
    let mut old_iter = old.iter().peekable();
    let mut new_iter = new.iter().peekable();

    loop {
        match (old_iter.peek().copied(), new_iter.peek().copied()) {
            (None, None) => break,
            (Some((name, content)), None) => {
                records.push(ChangeRecord::removed(name.clone(), content.to_vec()));
                old_iter.next();
            }
            (None, Some((name, content))) => {
                records.push(ChangeRecord::added(name.clone(), content.to_vec()));
                new_iter.next();
            }
            (Some((old_name, old_content)), Some((new_name, new_content))) => {
                match old_name.cmp(new_name) {
                    Ordering::Less => {
                        records.push(ChangeRecord::removed(
                            old_name.clone(),
                            old_content.to_vec(),
                        ));
                        old_iter.next();
                    }
                    Ordering::Greater => {
                        records.push(ChangeRecord::added(new_name.clone(), new_content.to_vec()));
                        new_iter.next();
                    }
                    Ordering::Equal => {
                        if old_content != new_content {
                            records.push(ChangeRecord::modified(
                                new_name.clone(),
                                old_content.to_vec(),
                                new_content.to_vec(),
                            ));
                        }
                        old_iter.next();
                        new_iter.next();
                    }
                }
            }
        }
    }

    ChangeSet::from_sorted(records)
}
