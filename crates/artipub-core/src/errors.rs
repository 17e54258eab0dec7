use artipub_core_types::RunId;
use thiserror::Error;

/// Result type alias using the canonical ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and process exit codes.
///
/// The five publish-cycle kinds (`StoreUnavailable`, `ConcurrentModification`,
/// `GeneratorTimeout`, `GeneratorError`, `PublishConflict`) are the only kinds
/// a `PublishCoordinator` ever returns; everything else is translated into one
/// of them at that boundary and kept as the error's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Publish cycle
    /// Backing store could not be reached or timed out
    StoreUnavailable,
    /// The store's head moved since the caller read it
    ConcurrentModification,
    /// Generator did not finish within its deadline
    GeneratorTimeout,
    /// Generator failed or produced an unusable artifact set
    GeneratorError,
    /// Conflict retries were exhausted
    PublishConflict,

    // Structural/Validation
    InvalidInput,
    InvalidArtifactName,
    DuplicateArtifact,
    InvalidConfig,
    NotFound,

    // Store integrity
    /// A blob referenced by the ledger is absent from the CAS
    MissingBlob,
    /// Stored bytes do not match their recorded digest
    CorruptSnapshot,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::StoreUnavailable => "ERR_STORE_UNAVAILABLE",
            ExErrorKind::ConcurrentModification => "ERR_CONCURRENT_MODIFICATION",
            ExErrorKind::GeneratorTimeout => "ERR_GENERATOR_TIMEOUT",
            ExErrorKind::GeneratorError => "ERR_GENERATOR",
            ExErrorKind::PublishConflict => "ERR_PUBLISH_CONFLICT",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidArtifactName => "ERR_INVALID_ARTIFACT_NAME",
            ExErrorKind::DuplicateArtifact => "ERR_DUPLICATE_ARTIFACT",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::MissingBlob => "ERR_MISSING_BLOB",
            ExErrorKind::CorruptSnapshot => "ERR_CORRUPT_SNAPSHOT",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether a publish cycle may be retried after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExErrorKind::ConcurrentModification)
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling plus optional
/// context for debugging: the operation, the artifact or entity involved, the
/// revision, the run that failed and the underlying cause.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    revision: Option<u64>,
    run_id: Option<RunId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            revision: None,
            run_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (an artifact name, a digest, a path)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add revision context
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    /// Add run context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the revision context, if any
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    /// Get the run context, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Walk the source chain and return the innermost error
    pub fn root_cause(&self) -> &ExError {
        let mut current = self;
        while let Some(next) = current.source_error() {
            current = next;
        }
        current
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(revision) = self.revision {
            write!(f, " (revision: {})", revision)?;
        }
        if let Some(source) = &self.source {
            write!(f, "; caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Validation failures of the artifact model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    /// Artifact name is empty
    #[error("Artifact name is empty")]
    EmptyName,

    /// Artifact name is absolute
    #[error("Artifact name must be relative: {name}")]
    AbsoluteName { name: String },

    /// Artifact name contains an empty, `.` or `..` segment
    #[error("Artifact name has an invalid segment '{segment}': {name}")]
    InvalidSegment { name: String, segment: String },

    /// Artifact name contains a forbidden character
    #[error("Artifact name contains forbidden character {ch:?}: {name}")]
    ForbiddenCharacter { name: String, ch: char },

    /// Two artifacts share a name within one set
    #[error("Duplicate artifact name: {name}")]
    Duplicate { name: String },
}

impl From<ArtifactError> for ExError {
    fn from(err: ArtifactError) -> Self {
        let (kind, name) = match &err {
            ArtifactError::EmptyName => (ExErrorKind::InvalidArtifactName, None),
            ArtifactError::AbsoluteName { name }
            | ArtifactError::InvalidSegment { name, .. }
            | ArtifactError::ForbiddenCharacter { name, .. } => {
                (ExErrorKind::InvalidArtifactName, Some(name.clone()))
            }
            ArtifactError::Duplicate { name } => {
                (ExErrorKind::DuplicateArtifact, Some(name.clone()))
            }
        };
        let ex = ExError::new(kind).with_message(err.to_string());
        match name {
            Some(name) => ex.with_entity_id(name),
            None => ex,
        }
    }
}

impl From<&ExError> for ExError {
    fn from(err: &ExError) -> Self {
        err.clone()
    }
}

/// Conversion from serde_json::Error to ExError
impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_cycle_error_kind_codes() {
        let cases = [
            (ExErrorKind::StoreUnavailable, "ERR_STORE_UNAVAILABLE"),
            (
                ExErrorKind::ConcurrentModification,
                "ERR_CONCURRENT_MODIFICATION",
            ),
            (ExErrorKind::GeneratorTimeout, "ERR_GENERATOR_TIMEOUT"),
            (ExErrorKind::GeneratorError, "ERR_GENERATOR"),
            (ExErrorKind::PublishConflict, "ERR_PUBLISH_CONFLICT"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_only_concurrent_modification_is_retryable() {
        assert!(ExErrorKind::ConcurrentModification.is_retryable());
        assert!(!ExErrorKind::GeneratorTimeout.is_retryable());
        assert!(!ExErrorKind::StoreUnavailable.is_retryable());
    }

    #[test]
    fn test_root_cause_walks_chain() {
        let inner = ExError::new(ExErrorKind::Io).with_message("disk gone");
        let outer = ExError::new(ExErrorKind::StoreUnavailable).with_source(inner);
        assert_eq!(outer.root_cause().kind(), ExErrorKind::Io);
    }

    #[test]
    fn test_duplicate_converts_with_entity() {
        let ex: ExError = ArtifactError::Duplicate {
            name: "a.json".into(),
        }
        .into();
        assert_eq!(ex.kind(), ExErrorKind::DuplicateArtifact);
        assert_eq!(ex.entity_id(), Some("a.json"));
    }
}
