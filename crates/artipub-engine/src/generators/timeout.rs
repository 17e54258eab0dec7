//! Deadline enforcement for arbitrary generators.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use artipub_core::errors::{ExError, ExErrorKind, Result};
use artipub_core::generator::ArtifactGenerator;
use artipub_core::model::ArtifactSet;

use super::generator_error;

const OP: &str = "generate";

/// Run `generator` on a worker thread and wait at most `timeout`.
///
/// With `None` the generator runs on the calling thread. On timeout the
/// worker is abandoned; its eventual result is dropped.
///
/// # Errors
///
/// `GeneratorTimeout` past the deadline, `GeneratorError` if the worker
/// panicked or could not be started, otherwise whatever the generator
/// returned.
pub fn generate_with_timeout(
    generator: Arc<dyn ArtifactGenerator>,
    timeout: Option<Duration>,
) -> Result<ArtifactSet> {
    let Some(timeout) = timeout else {
        return generator.generate();
    };

    let (tx, rx) = mpsc::sync_channel(1);
    let worker = Arc::clone(&generator);
    thread::Builder::new()
        .name("artipub-generator".to_string())
        .spawn(move || {
            // Receiver may be gone after a timeout
            let _ = tx.send(worker.generate());
        })
        .map_err(|e| generator_error(OP, format!("Failed to start generator thread: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(ExError::new(ExErrorKind::GeneratorTimeout)
            .with_op(OP)
            .with_entity_id(generator.describe())
            .with_message(format!(
                "Generator did not finish within {} ms",
                timeout.as_millis()
            ))),
        Err(RecvTimeoutError::Disconnected) => Err(generator_error(OP, "Generator panicked")
            .with_entity_id(generator.describe())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artipub_core::generator::StaticGenerator;

    #[test]
    fn test_returns_result_within_deadline() {
        let set = ArtifactSet::from_pairs([("a.json", "1")]).unwrap();
        let generator: Arc<dyn ArtifactGenerator> = Arc::new(StaticGenerator::new(set.clone()));
        let out = generate_with_timeout(generator, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(out, set);
    }

    #[test]
    fn test_slow_generator_times_out() {
        let generator: Arc<dyn ArtifactGenerator> = Arc::new(|| -> Result<ArtifactSet> {
            thread::sleep(Duration::from_secs(2));
            Ok(ArtifactSet::new())
        });
        let err = generate_with_timeout(generator, Some(Duration::from_millis(50))).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::GeneratorTimeout);
    }

    #[test]
    fn test_panicking_generator_is_generator_error() {
        let generator: Arc<dyn ArtifactGenerator> =
            Arc::new(|| -> Result<ArtifactSet> { panic!("boom") });
        let err = generate_with_timeout(generator, Some(Duration::from_secs(5))).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::GeneratorError);
    }

    #[test]
    fn test_generator_errors_pass_through() {
        let generator: Arc<dyn ArtifactGenerator> = Arc::new(|| -> Result<ArtifactSet> {
            Err(ExError::new(ExErrorKind::Io).with_message("disk"))
        });
        let err = generate_with_timeout(generator, Some(Duration::from_secs(5))).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Io);
    }
}
