use plait_types::{
    ApplicationKvState, Branch, BranchesMetaState, CommitData, HotCheckpoint, RepoState, Sha,
};

use crate::error::StoreResult;

/// Storage collaborator for one or more repositories.
///
/// Every record is addressed by `repo_id` plus a sha or a name. All
/// implementations must satisfy these invariants:
/// - Reads return `Ok(None)` for a miss and `Err` only for backend failure.
/// - Commits and checkpoints are content-addressed: writing the same sha
///   twice is a no-op, so concurrent identical writes are safe.
/// - Branches, the repository state, the branch bookkeeping, the hot
///   checkpoint and the working state are single records that a save
///   replaces.
/// - The store never interprets what it holds.
///
/// Callers serialize mutations per repository; implementations take no
/// repository-level lock across calls.
pub trait RepoStore: Send + Sync {
    fn read_commit(&self, repo_id: &str, sha: &Sha) -> StoreResult<Option<CommitData>>;

    fn save_commit(&self, repo_id: &str, commit: &CommitData) -> StoreResult<()>;

    /// Every commit of the repository, in no particular order.
    fn list_commits(&self, repo_id: &str) -> StoreResult<Vec<CommitData>>;

    fn read_checkpoint(&self, repo_id: &str, sha: &Sha)
        -> StoreResult<Option<ApplicationKvState>>;

    /// Persist the full state at `sha`. The first write for a sha wins.
    fn save_checkpoint(
        &self,
        repo_id: &str,
        sha: &Sha,
        state: &ApplicationKvState,
    ) -> StoreResult<()>;

    fn read_hot_checkpoint(&self, repo_id: &str) -> StoreResult<Option<HotCheckpoint>>;

    fn save_hot_checkpoint(&self, repo_id: &str, checkpoint: &HotCheckpoint) -> StoreResult<()>;

    fn read_branch(&self, repo_id: &str, branch_id: &str) -> StoreResult<Option<Branch>>;

    fn save_branch(&self, repo_id: &str, branch: &Branch) -> StoreResult<()>;

    /// Every branch of the repository, sorted by id.
    fn list_branches(&self, repo_id: &str) -> StoreResult<Vec<Branch>>;

    fn read_current_repo_state(&self, repo_id: &str) -> StoreResult<Option<RepoState>>;

    fn save_current_repo_state(&self, repo_id: &str, state: &RepoState) -> StoreResult<()>;

    fn read_branches_meta_state(&self, repo_id: &str)
        -> StoreResult<Option<BranchesMetaState>>;

    fn save_branches_meta_state(&self, repo_id: &str, meta: &BranchesMetaState)
        -> StoreResult<()>;

    /// The uncommitted working state, if one was ever saved.
    fn read_current_state(&self, repo_id: &str) -> StoreResult<Option<ApplicationKvState>>;

    fn save_current_state(&self, repo_id: &str, state: &ApplicationKvState) -> StoreResult<()>;

    /// Read several commits at once. Missing shas yield `None` in place.
    fn read_commits(&self, repo_id: &str, shas: &[Sha]) -> StoreResult<Vec<Option<CommitData>>> {
        shas.iter().map(|sha| self.read_commit(repo_id, sha)).collect()
    }
}
