//! Error types for the diff crate.

/// Errors that can occur while applying a diff.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// A remove entry points past the end of the sequence it is applied to.
    #[error("remove index {index} out of range for sequence of length {len}")]
    RemoveOutOfRange { index: usize, len: usize },

    /// An add entry would leave a gap in the resulting sequence.
    #[error("add index {index} out of range for sequence of length {len}")]
    AddOutOfRange { index: usize, len: usize },

    /// A namespace of a state diff failed to apply.
    #[error("namespace {namespace}: {source}")]
    Namespace {
        namespace: String,
        #[source]
        source: Box<DiffError>,
    },
}

impl DiffError {
    pub(crate) fn in_namespace(self, namespace: impl Into<String>) -> Self {
        Self::Namespace {
            namespace: namespace.into(),
            source: Box::new(self),
        }
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
