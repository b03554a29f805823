use plait_dag::DagError;
use plait_diff::DiffError;
use plait_ledger::LedgerError;
use plait_store::StoreError;
use plait_types::TypeError;
use thiserror::Error;

/// Coarse classification of an [`SdkError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A commit, branch or repository does not exist.
    NotFound,
    /// The operation is not allowed in the current repository state.
    /// Raised before anything is written.
    InvalidState,
    /// Incoming changes cannot be combined automatically.
    Conflict,
    /// Stored history is inconsistent (sha mismatch, idx gap, bad diff).
    Corruption,
    /// The storage backend failed.
    Storage,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("repository not initialized: {0}")]
    NotInitialized(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("merge conflict: {0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid name: {0}")]
    Type(#[from] TypeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("graph error: {0}")]
    Dag(#[from] DagError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized(_) | Self::BranchNotFound(_) => ErrorKind::NotFound,
            Self::InvalidOperation(_) | Self::Config(_) | Self::Type(_) => ErrorKind::InvalidState,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::Storage,
            Self::Diff(_) => ErrorKind::Corruption,
            Self::Ledger(err) => match err {
                LedgerError::CommitNotFound(_) => ErrorKind::NotFound,
                LedgerError::Store(_) => ErrorKind::Storage,
                LedgerError::IndexGap { .. }
                | LedgerError::ShaMismatch { .. }
                | LedgerError::Replay { .. }
                | LedgerError::Serialization(_) => ErrorKind::Corruption,
            },
            Self::Dag(err) => match err {
                DagError::CommitNotFound(_) => ErrorKind::NotFound,
                DagError::DanglingParent { .. } | DagError::DuplicateCommit(_) => {
                    ErrorKind::Corruption
                }
            },
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
