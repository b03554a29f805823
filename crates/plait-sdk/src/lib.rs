//! High-level SDK for Plait.
//!
//! Plait versions structured repository state: a repository's description,
//! licenses, plugins, binaries and flattened plugin stores are committed as
//! content-addressed diffs, replayed through checkpoints, and merged three
//! ways. This crate is the entry point for applications embedding Plait.
//!
//! ```no_run
//! use plait_sdk::{ApplicationKvState, InMemoryRepoStore, RepoConfig, Repository};
//!
//! # fn main() -> plait_sdk::SdkResult<()> {
//! let repo = Repository::open(InMemoryRepoStore::new(), "palette", RepoConfig::default())
//!     .with_user("ada");
//! repo.init()?;
//!
//! let mut state = ApplicationKvState::empty();
//! state.set_description_text("Colors for the design system");
//! repo.update_working_state(&state)?;
//! repo.commit("describe the repository")?;
//! # Ok(())
//! # }
//! ```

pub mod commit;
pub mod config;
pub mod error;
pub mod merge;
pub mod repository;

pub use commit::{CommitSummary, MergeReport, MergeStatus};
pub use config::RepoConfig;
pub use error::{ErrorKind, SdkError, SdkResult};
pub use repository::{Repository, DEFAULT_BRANCH};

// Re-export key types
pub use plait_dag::{SourceCommitNode, SourceGraph};
pub use plait_diff::{apply_diff, apply_state_diff, diff_states, get_diff, LcsCache};
pub use plait_ledger::{CheckpointPolicy, ValidationReport};
pub use plait_merge::{can_auto_merge, can_auto_merge_states, merge_sequence, merge_states};
pub use plait_store::{InMemoryRepoStore, RepoStore};
pub use plait_types::{
    ApplicationKvState, Branch, CommitData, DiffElement, MergeDirection, RepoState, Sha,
    StateDiff,
};
