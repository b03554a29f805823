//! Error types for the commit graph.

use plait_types::Sha;

/// Errors that can occur while building or querying a [`SourceGraph`](crate::SourceGraph).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DagError {
    /// A referenced commit is not in the graph.
    #[error("commit not found in graph: {0}")]
    CommitNotFound(Sha),

    /// A commit's parent is not among the commits the graph was built from.
    #[error("dangling parent reference: commit {commit} references missing parent {parent}")]
    DanglingParent {
        /// The commit containing the bad reference.
        commit: Sha,
        /// The missing parent.
        parent: Sha,
    },

    /// The same sha was supplied twice.
    #[error("duplicate commit: {0}")]
    DuplicateCommit(Sha),
}

/// Convenience alias for graph results.
pub type DagResult<T> = Result<T, DagError>;
