//! The publish cycle.
//!
//! `READ_SNAPSHOT → GENERATE → DIFF → {NO_CHANGE | COMMIT}`; a commit that
//! loses the optimistic concurrency race goes back to `READ_SNAPSHOT` until
//! the retry policy is exhausted. The single `commit` call is the only side
//! effect of a run.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use artipub_core::diff::{compute_diff, ChangeSet};
use artipub_core::errors::{ExError, ExErrorKind, Result};
use artipub_core::generator::ArtifactGenerator;
use artipub_core::model::ArtifactSet;
use artipub_core::store::SnapshotStore;
use artipub_core::{log_op_end, log_op_error, log_op_start};
use artipub_core_types::RunId;
use serde::Serialize;

use crate::generators::generate_with_timeout;
use crate::retry::RetryPolicy;

/// Default deadline for one generator invocation
pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub retry: RetryPolicy,
    /// `None` runs the generator unbounded on the calling thread
    pub generator_timeout: Option<Duration>,
    /// Report what would be committed without committing
    pub dry_run: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            generator_timeout: Some(DEFAULT_GENERATOR_TIMEOUT),
            dry_run: false,
        }
    }
}

/// What a successful publish committed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReceipt {
    pub revision: u64,
    pub parent_revision: u64,
    pub set_digest: String,
    pub changes: ChangeSet,
    /// Cycles run, the successful one included
    pub attempts: u32,
    pub run_id: RunId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishResult {
    Published(PublishReceipt),
    /// Generated set equals the current snapshot; the store was not touched
    NoChange { revision: u64 },
    /// Dry run found changes against `base_revision`
    WouldPublish {
        base_revision: u64,
        changes: ChangeSet,
    },
}

impl PublishResult {
    /// Revision current after the run (the base revision for a dry run)
    pub fn revision(&self) -> u64 {
        match self {
            PublishResult::Published(receipt) => receipt.revision,
            PublishResult::NoChange { revision } => *revision,
            PublishResult::WouldPublish { base_revision, .. } => *base_revision,
        }
    }

    pub fn changes(&self) -> Option<&ChangeSet> {
        match self {
            PublishResult::Published(receipt) => Some(&receipt.changes),
            PublishResult::NoChange { .. } => None,
            PublishResult::WouldPublish { changes, .. } => Some(changes),
        }
    }

    pub fn change_count(&self) -> usize {
        self.changes().map_or(0, ChangeSet::len)
    }

    /// Stable lowercase label for logs and CLI output
    pub fn label(&self) -> &'static str {
        match self {
            PublishResult::Published(_) => "published",
            PublishResult::NoChange { .. } => "no_change",
            PublishResult::WouldPublish { .. } => "would_publish",
        }
    }
}

/// Runs publish cycles of one generator against one store.
///
/// Holds no state between runs; any number of coordinators, in one process
/// or many, may target the same store.
pub struct PublishCoordinator {
    store: Arc<dyn SnapshotStore>,
    generator: Arc<dyn ArtifactGenerator>,
    options: PublishOptions,
}

impl PublishCoordinator {
    pub fn new(store: Arc<dyn SnapshotStore>, generator: Arc<dyn ArtifactGenerator>) -> Self {
        Self {
            store,
            generator,
            options: PublishOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PublishOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PublishOptions {
        &self.options
    }

    /// Run one publish cycle.
    ///
    /// # Errors
    ///
    /// Exactly one of `StoreUnavailable`, `GeneratorTimeout`,
    /// `GeneratorError` or `PublishConflict`, with the underlying error kept
    /// as its source. Nothing is published on error.
    pub fn run(&self) -> Result<PublishResult> {
        let run_id = RunId::new();
        log_op_start!(
            "publish_run",
            run_id = %run_id,
            generator = %self.generator.describe(),
            store = %self.store.describe(),
            dry_run = self.options.dry_run
        );
        let start = Instant::now();

        let result = self.run_cycles(&run_id);

        match &result {
            Ok(outcome) => {
                let attempts = match outcome {
                    PublishResult::Published(receipt) => receipt.attempts,
                    _ => 1,
                };
                log_op_end!(
                    "publish_run",
                    duration_ms = start.elapsed().as_millis() as u64,
                    run_id = %run_id,
                    outcome = outcome.label(),
                    revision = outcome.revision(),
                    change_count = outcome.change_count() as u64,
                    attempts = attempts
                );
            }
            Err(e) => {
                log_op_error!(
                    "publish_run",
                    e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    run_id = %run_id
                );
            }
        }

        result
    }

    fn run_cycles(&self, run_id: &RunId) -> Result<PublishResult> {
        let retry = &self.options.retry;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let old = self
                .store
                .current()
                .map_err(|e| store_failure("read_snapshot", e, run_id))?;
            let new = self.generate(run_id)?;

            let changes = compute_diff(old.artifacts(), &new);
            tracing::debug!(
                run_id = %run_id,
                attempt,
                base_revision = old.revision(),
                artifact_count = new.len() as u64,
                change_count = changes.len() as u64,
                "Computed change set"
            );

            if changes.is_empty() {
                return Ok(PublishResult::NoChange {
                    revision: old.revision(),
                });
            }
            if self.options.dry_run {
                return Ok(PublishResult::WouldPublish {
                    base_revision: old.revision(),
                    changes,
                });
            }

            match self.store.commit_for_run(old.revision(), new, run_id) {
                Ok(snapshot) => {
                    return Ok(PublishResult::Published(PublishReceipt {
                        revision: snapshot.revision(),
                        parent_revision: old.revision(),
                        set_digest: snapshot.set_digest().to_string(),
                        changes,
                        attempts: attempt,
                        run_id: run_id.clone(),
                    }));
                }
                Err(e) if e.kind().is_retryable() => {
                    if !retry.should_retry(attempt) {
                        return Err(ExError::new(ExErrorKind::PublishConflict)
                            .with_op("publish_run")
                            .with_run_id(run_id.clone())
                            .with_revision(old.revision())
                            .with_message(format!(
                                "Lost the commit race on {} attempts",
                                attempt
                            ))
                            .with_source(e));
                    }
                    let delay = retry.delay(attempt);
                    tracing::warn!(
                        run_id = %run_id,
                        attempt,
                        base_revision = old.revision(),
                        delay_ms = delay.as_millis() as u64,
                        "Concurrent modification, retrying publish cycle"
                    );
                    thread::sleep(delay);
                }
                Err(e) if rejects_artifacts(&e) => {
                    return Err(ExError::new(ExErrorKind::GeneratorError)
                        .with_op("commit")
                        .with_run_id(run_id.clone())
                        .with_revision(old.revision())
                        .with_message("Store rejected the generated artifact set")
                        .with_source(e));
                }
                Err(e) => return Err(store_failure("commit", e, run_id)),
            }
        }
    }

    fn generate(&self, run_id: &RunId) -> Result<ArtifactSet> {
        generate_with_timeout(Arc::clone(&self.generator), self.options.generator_timeout).map_err(
            |e| match e.kind() {
                ExErrorKind::GeneratorTimeout | ExErrorKind::GeneratorError => {
                    e.with_run_id(run_id.clone())
                }
                _ => ExError::new(ExErrorKind::GeneratorError)
                    .with_op("generate")
                    .with_run_id(run_id.clone())
                    .with_message("Generator failed")
                    .with_source(e),
            },
        )
    }
}

/// The set itself is unacceptable; retrying cannot help
fn rejects_artifacts(err: &ExError) -> bool {
    matches!(
        err.kind(),
        ExErrorKind::InvalidInput
            | ExErrorKind::InvalidArtifactName
            | ExErrorKind::DuplicateArtifact
    )
}

fn store_failure(op: &str, err: ExError, run_id: &RunId) -> ExError {
    ExError::new(ExErrorKind::StoreUnavailable)
        .with_op(op)
        .with_run_id(run_id.clone())
        .with_message("Snapshot store failed")
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use artipub_core::generator::StaticGenerator;
    use artipub_core::store::MemorySnapshotStore;

    fn set(pairs: &[(&str, &str)]) -> ArtifactSet {
        ArtifactSet::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_result_accessors() {
        let outcome = PublishResult::NoChange { revision: 4 };
        assert_eq!(outcome.revision(), 4);
        assert_eq!(outcome.change_count(), 0);
        assert_eq!(outcome.label(), "no_change");
    }

    #[test]
    fn test_published_result_serializes_with_outcome_tag() {
        let store = Arc::new(MemorySnapshotStore::new());
        let generator = Arc::new(StaticGenerator::new(set(&[("a.json", "1")])));
        let outcome = PublishCoordinator::new(store, generator).run().unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "published");
        assert_eq!(json["revision"], 1);
        assert_eq!(json["attempts"], 1);
    }

    #[test]
    fn test_generator_io_error_becomes_generator_error() {
        let store = Arc::new(MemorySnapshotStore::new());
        let generator = Arc::new(|| -> Result<ArtifactSet> {
            Err(ExError::new(ExErrorKind::Io).with_message("read failed"))
        });
        let err = PublishCoordinator::new(store, generator).run().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::GeneratorError);
        assert_eq!(err.root_cause().kind(), ExErrorKind::Io);
        assert!(err.run_id().is_some());
    }
}
