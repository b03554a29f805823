//! Commit history for Plait.
//!
//! This crate owns everything that follows parent links:
//! - Content shas for commits, and the commit/rebase constructors that seal them
//! - History walks and the divergence origin of two histories
//! - `CommitStateStore`: state reconstruction by diff replay from the hot
//!   checkpoint or the nearest persisted checkpoint
//! - Chain validation (sha, idx and parent integrity)

pub mod commit;
pub mod error;
pub mod history;
pub mod replay;
pub mod validation;

pub use commit::{
    compute_sha, create_commit, create_merge_base, create_merge_commit, rebase_commit, seal,
    verify_sha,
};
pub use error::{LedgerError, LedgerResult};
pub use history::{commits_after, divergence_origin, get_history, read_commit};
pub use replay::{CheckpointPolicy, CommitStateStore};
pub use validation::{ChainValidator, ValidationReport, Violation, ViolationKind};
