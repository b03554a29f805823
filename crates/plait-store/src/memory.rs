use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use plait_types::{
    ApplicationKvState, Branch, BranchesMetaState, CommitData, HotCheckpoint, RepoState, Sha,
};
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::traits::RepoStore;

/// Everything held for one repository.
#[derive(Default)]
struct RepoData {
    commits: HashMap<Sha, CommitData>,
    checkpoints: HashMap<Sha, ApplicationKvState>,
    hot_checkpoint: Option<HotCheckpoint>,
    branches: HashMap<String, Branch>,
    repo_state: Option<RepoState>,
    branches_meta: Option<BranchesMetaState>,
    working_state: Option<ApplicationKvState>,
}

/// In-memory, HashMap-based repository store.
///
/// Intended for tests and embedding. All repositories are held in memory
/// behind a `RwLock` for safe concurrent access. Records are cloned on
/// read and write.
pub struct InMemoryRepoStore {
    repos: RwLock<HashMap<String, RepoData>>,
}

impl InMemoryRepoStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            repos: RwLock::new(HashMap::new()),
        }
    }

    fn read_lock(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, RepoData>>> {
        self.repos
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_lock(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, RepoData>>> {
        self.repos
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn with_repo<T>(
        &self,
        repo_id: &str,
        f: impl FnOnce(&RepoData) -> T,
    ) -> StoreResult<Option<T>> {
        let repos = self.read_lock()?;
        Ok(repos.get(repo_id).map(f))
    }

    fn with_repo_mut(&self, repo_id: &str, f: impl FnOnce(&mut RepoData)) -> StoreResult<()> {
        let mut repos = self.write_lock()?;
        f(repos.entry(repo_id.to_string()).or_default());
        Ok(())
    }

    /// Number of repositories with at least one record.
    pub fn repo_count(&self) -> usize {
        self.read_lock().map(|repos| repos.len()).unwrap_or(0)
    }

    /// Number of commits stored for `repo_id`.
    pub fn commit_count(&self, repo_id: &str) -> usize {
        self.with_repo(repo_id, |repo| repo.commits.len())
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    /// Number of persisted checkpoints for `repo_id`.
    pub fn checkpoint_count(&self, repo_id: &str) -> usize {
        self.with_repo(repo_id, |repo| repo.checkpoints.len())
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    /// Shas of every checkpoint for `repo_id`, sorted.
    pub fn checkpoint_shas(&self, repo_id: &str) -> Vec<Sha> {
        let mut shas = self
            .with_repo(repo_id, |repo| repo.checkpoints.keys().copied().collect())
            .ok()
            .flatten()
            .unwrap_or_else(Vec::new);
        shas.sort();
        shas
    }

    /// Drop every record of every repository.
    pub fn clear(&self) {
        if let Ok(mut repos) = self.repos.write() {
            repos.clear();
        }
    }
}

impl Default for InMemoryRepoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoStore for InMemoryRepoStore {
    fn read_commit(&self, repo_id: &str, sha: &Sha) -> StoreResult<Option<CommitData>> {
        Ok(self
            .with_repo(repo_id, |repo| repo.commits.get(sha).cloned())?
            .flatten())
    }

    fn save_commit(&self, repo_id: &str, commit: &CommitData) -> StoreResult<()> {
        trace!(repo_id, sha = %commit.sha.short_hex(), "save commit");
        self.with_repo_mut(repo_id, |repo| {
            // Content-addressed: the same sha always maps to the same commit.
            repo.commits
                .entry(commit.sha)
                .or_insert_with(|| commit.clone());
        })
    }

    fn list_commits(&self, repo_id: &str) -> StoreResult<Vec<CommitData>> {
        Ok(self
            .with_repo(repo_id, |repo| repo.commits.values().cloned().collect())?
            .unwrap_or_default())
    }

    fn read_checkpoint(
        &self,
        repo_id: &str,
        sha: &Sha,
    ) -> StoreResult<Option<ApplicationKvState>> {
        Ok(self
            .with_repo(repo_id, |repo| repo.checkpoints.get(sha).cloned())?
            .flatten())
    }

    fn save_checkpoint(
        &self,
        repo_id: &str,
        sha: &Sha,
        state: &ApplicationKvState,
    ) -> StoreResult<()> {
        trace!(repo_id, sha = %sha.short_hex(), "save checkpoint");
        self.with_repo_mut(repo_id, |repo| {
            repo.checkpoints
                .entry(*sha)
                .or_insert_with(|| state.clone());
        })
    }

    fn read_hot_checkpoint(&self, repo_id: &str) -> StoreResult<Option<HotCheckpoint>> {
        Ok(self
            .with_repo(repo_id, |repo| repo.hot_checkpoint.clone())?
            .flatten())
    }

    fn save_hot_checkpoint(&self, repo_id: &str, checkpoint: &HotCheckpoint) -> StoreResult<()> {
        self.with_repo_mut(repo_id, |repo| {
            repo.hot_checkpoint = Some(checkpoint.clone());
        })
    }

    fn read_branch(&self, repo_id: &str, branch_id: &str) -> StoreResult<Option<Branch>> {
        Ok(self
            .with_repo(repo_id, |repo| repo.branches.get(branch_id).cloned())?
            .flatten())
    }

    fn save_branch(&self, repo_id: &str, branch: &Branch) -> StoreResult<()> {
        self.with_repo_mut(repo_id, |repo| {
            repo.branches.insert(branch.id.clone(), branch.clone());
        })
    }

    fn list_branches(&self, repo_id: &str) -> StoreResult<Vec<Branch>> {
        let mut branches: Vec<Branch> = self
            .with_repo(repo_id, |repo| repo.branches.values().cloned().collect())?
            .unwrap_or_default();
        branches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(branches)
    }

    fn read_current_repo_state(&self, repo_id: &str) -> StoreResult<Option<RepoState>> {
        Ok(self
            .with_repo(repo_id, |repo| repo.repo_state.clone())?
            .flatten())
    }

    fn save_current_repo_state(&self, repo_id: &str, state: &RepoState) -> StoreResult<()> {
        self.with_repo_mut(repo_id, |repo| {
            repo.repo_state = Some(state.clone());
        })
    }

    fn read_branches_meta_state(
        &self,
        repo_id: &str,
    ) -> StoreResult<Option<BranchesMetaState>> {
        Ok(self
            .with_repo(repo_id, |repo| repo.branches_meta.clone())?
            .flatten())
    }

    fn save_branches_meta_state(
        &self,
        repo_id: &str,
        meta: &BranchesMetaState,
    ) -> StoreResult<()> {
        self.with_repo_mut(repo_id, |repo| {
            repo.branches_meta = Some(meta.clone());
        })
    }

    fn read_current_state(&self, repo_id: &str) -> StoreResult<Option<ApplicationKvState>> {
        Ok(self
            .with_repo(repo_id, |repo| repo.working_state.clone())?
            .flatten())
    }

    fn save_current_state(&self, repo_id: &str, state: &ApplicationKvState) -> StoreResult<()> {
        self.with_repo_mut(repo_id, |repo| {
            repo.working_state = Some(state.clone());
        })
    }
}

impl std::fmt::Debug for InMemoryRepoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepoStore")
            .field("repo_count", &self.repo_count())
            .finish()
    }
}
