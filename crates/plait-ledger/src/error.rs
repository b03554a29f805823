use plait_diff::DiffError;
use plait_store::StoreError;
use plait_types::Sha;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("commit not found: {0}")]
    CommitNotFound(Sha),

    #[error("commit {sha} has idx {found}, expected {expected}")]
    IndexGap { sha: Sha, expected: u64, found: u64 },

    #[error("commit {sha} does not match its content hash {computed}")]
    ShaMismatch { sha: Sha, computed: Sha },

    #[error("cannot replay commit {sha}: {source}")]
    Replay {
        sha: Sha,
        #[source]
        source: DiffError,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
