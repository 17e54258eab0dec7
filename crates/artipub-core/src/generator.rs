//! The artifact generator seam.
//!
//! A generator is an opaque function from live external state to an
//! [`ArtifactSet`]. The pipeline only depends on this contract; concrete
//! process- and filesystem-backed generators live in `artipub-engine`.

use crate::errors::Result;
use crate::model::ArtifactSet;

/// Produces the full set of artifacts for one publish cycle.
///
/// Implementations must be callable repeatedly and must return a complete
/// set each time. Partial output is an error, never a smaller set.
pub trait ArtifactGenerator: Send + Sync {
    /// Regenerate every artifact.
    ///
    /// # Errors
    ///
    /// Any failure to produce a complete set. The coordinator reports these
    /// as `GeneratorError` unless the kind is already `GeneratorTimeout`.
    fn generate(&self) -> Result<ArtifactSet>;

    /// Short label used in logs
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<F> ArtifactGenerator for F
where
    F: Fn() -> Result<ArtifactSet> + Send + Sync,
{
    fn generate(&self) -> Result<ArtifactSet> {
        self()
    }

    fn describe(&self) -> String {
        "closure".to_string()
    }
}

/// Returns the same artifact set on every call.
#[derive(Debug, Clone, Default)]
pub struct StaticGenerator {
    artifacts: ArtifactSet,
}

impl StaticGenerator {
    pub fn new(artifacts: ArtifactSet) -> Self {
        Self { artifacts }
    }
}

impl ArtifactGenerator for StaticGenerator {
    fn generate(&self) -> Result<ArtifactSet> {
        Ok(self.artifacts.clone())
    }

    fn describe(&self) -> String {
        format!("static({} artifacts)", self.artifacts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ExError, ExErrorKind};

    #[test]
    fn test_static_generator_is_repeatable() {
        let set = ArtifactSet::from_pairs([("a.json", "1")]).unwrap();
        let generator = StaticGenerator::new(set.clone());
        assert_eq!(generator.generate().unwrap(), set);
        assert_eq!(generator.generate().unwrap(), set);
        assert_eq!(generator.describe(), "static(1 artifacts)");
    }

    #[test]
    fn test_closure_generator() {
        let generator = || -> Result<ArtifactSet> {
            Err(ExError::new(ExErrorKind::GeneratorError).with_message("upstream down"))
        };
        let err = generator.generate().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::GeneratorError);
        assert_eq!(ArtifactGenerator::describe(&generator), "closure");
    }
}
