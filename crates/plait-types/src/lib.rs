//! Foundation types for Plait.
//!
//! Plait versions structured application state: every plugin's data is
//! flattened by the schema layer into an ordered sequence of
//! [`DiffElement`]s, and commits record positional [`Diff`]s between those
//! sequences. Every other Plait crate depends on `plait-types`.
//!
//! # Key Types
//!
//! - [`Sha`]: Content hash identifying a commit
//! - [`DiffElement`] / [`Diff`]: Versioned record and positional edit script
//! - [`ApplicationKvState`] / [`StateDiff`]: Materialized state and its per-namespace diff
//! - [`HotCheckpoint`]: Cached state of the head commit
//! - [`CommitData`]: A commit in the history
//! - [`Branch`] / [`BranchesMetaState`]: Named heads and their bookkeeping
//! - [`RepoState`] / [`MergeState`] / [`MergeDirection`]: Checked-out state and merge progress

pub mod branch;
pub mod commit;
pub mod element;
pub mod error;
pub mod sha;
pub mod state;

pub use branch::{
    branch_id_from_name, validate_branch_name, Branch, BranchMeta, BranchesMetaState,
    MergeDirection, MergeState, RepoState,
};
pub use commit::CommitData;
pub use element::{Diff, DiffElement};
pub use error::TypeError;
pub use sha::Sha;
pub use state::{ApplicationKvState, HotCheckpoint, StateDiff};
