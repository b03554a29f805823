use std::sync::Arc;

use chrono::Utc;
use plait_dag::SourceGraph;
use plait_diff::{diff_states, LcsCache};
use plait_ledger::{
    create_commit, get_history, read_commit, ChainValidator, CommitStateStore, ValidationReport,
};
use plait_store::RepoStore;
use plait_types::{
    branch_id_from_name, ApplicationKvState, Branch, BranchesMetaState, CommitData, RepoState,
    Sha, StateDiff,
};
use tracing::{info, warn};

use crate::commit::CommitSummary;
use crate::config::RepoConfig;
use crate::error::{SdkError, SdkResult};

/// Branch created by [`Repository::init`].
pub const DEFAULT_BRANCH: &str = "main";

/// High-level Plait repository API.
///
/// A `Repository` is a view over one repository id in a [`RepoStore`]. It
/// holds no repository data itself; every call reads what it needs from the
/// store, computes, and writes only once the whole operation has succeeded.
/// Mutating calls on one repository must be serialized by the caller.
pub struct Repository<S: RepoStore> {
    pub(crate) store: S,
    pub(crate) repo_id: String,
    pub(crate) user_id: Option<String>,
    pub(crate) config: RepoConfig,
    pub(crate) cache: Arc<LcsCache>,
}

impl<S: RepoStore> Repository<S> {
    /// Open `repo_id` in `store` with a private LCS cache.
    pub fn open(store: S, repo_id: impl Into<String>, config: RepoConfig) -> Self {
        let cache = Arc::new(LcsCache::new(config.cache_ttl()));
        Self {
            store,
            repo_id: repo_id.into(),
            user_id: None,
            config,
            cache,
        }
    }

    /// Share an LCS cache with other repositories in the process.
    pub fn with_cache(mut self, cache: Arc<LcsCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Set the author recorded on commits and branches.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn set_user(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    // ---- Accessors ----

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<LcsCache> {
        &self.cache
    }

    pub(crate) fn states(&self) -> CommitStateStore<'_, S> {
        CommitStateStore::new(&self.store, &self.repo_id, self.config.checkpoint_policy())
    }

    pub(crate) fn require_user(&self) -> SdkResult<&str> {
        match self.user_id.as_deref() {
            Some(user) if !user.trim().is_empty() => Ok(user),
            _ => {
                warn!(repo_id = %self.repo_id, "refused: no author identity");
                Err(SdkError::InvalidOperation("no author identity set".into()))
            }
        }
    }

    pub(crate) fn read_commit(&self, sha: &Sha) -> SdkResult<CommitData> {
        Ok(read_commit(&self.store, &self.repo_id, sha)?)
    }

    // ---- Lifecycle ----

    /// Create the repository with an empty `main` branch checked out.
    pub fn init(&self) -> SdkResult<RepoState> {
        let user = self.require_user()?;
        if self.store.read_current_repo_state(&self.repo_id)?.is_some() {
            return Err(SdkError::InvalidOperation(format!(
                "repository {} already initialized",
                self.repo_id
            )));
        }

        let branch = Branch::new(DEFAULT_BRANCH, None, None, user, Utc::now())?;
        let mut meta = BranchesMetaState::default();
        meta.record(&branch.id, None, true);
        let state = RepoState::on_branch(branch.id.clone(), None);

        self.store.save_branch(&self.repo_id, &branch)?;
        self.store.save_branches_meta_state(&self.repo_id, &meta)?;
        self.store.save_current_repo_state(&self.repo_id, &state)?;
        self.store
            .save_current_state(&self.repo_id, &ApplicationKvState::empty())?;
        info!(repo_id = %self.repo_id, "initialized repository");
        Ok(state)
    }

    /// What is checked out, and whether a merge is in progress.
    pub fn repo_state(&self) -> SdkResult<RepoState> {
        self.store
            .read_current_repo_state(&self.repo_id)?
            .ok_or_else(|| SdkError::NotInitialized(self.repo_id.clone()))
    }

    /// The checked-out commit, `None` before the first commit.
    pub fn head(&self) -> SdkResult<Option<Sha>> {
        Ok(self.repo_state()?.commit)
    }

    /// The checked-out branch, `None` when the head is detached.
    pub fn current_branch(&self) -> SdkResult<Option<Branch>> {
        match self.repo_state()?.branch {
            Some(id) => Ok(Some(
                self.store
                    .read_branch(&self.repo_id, &id)?
                    .ok_or(SdkError::BranchNotFound(id))?,
            )),
            None => Ok(None),
        }
    }

    // ---- State ----

    /// The materialized state at `sha`; `None` is the empty state.
    pub fn get_commit_state(&self, sha: Option<&Sha>) -> SdkResult<ApplicationKvState> {
        Ok(self.states().get_commit_state(sha)?)
    }

    /// The committed state of the head, before uncommitted edits.
    pub fn get_unstaged_commit_state(&self) -> SdkResult<ApplicationKvState> {
        let head = self.head()?;
        Ok(self.states().get_unstaged_commit_state(head.as_ref())?)
    }

    /// The working state, including uncommitted edits.
    pub fn working_state(&self) -> SdkResult<ApplicationKvState> {
        match self.store.read_current_state(&self.repo_id)? {
            Some(state) => Ok(state),
            None => self.get_unstaged_commit_state(),
        }
    }

    /// Replace the working state. Also how a conflicted merge is resolved
    /// by hand before [`resolve_merge`](Self::resolve_merge).
    pub fn update_working_state(&self, state: &ApplicationKvState) -> SdkResult<()> {
        self.repo_state()?;
        self.store.save_current_state(&self.repo_id, state)?;
        Ok(())
    }

    /// The diff a commit would record right now.
    pub fn working_diff(&self) -> SdkResult<StateDiff> {
        let committed = self.get_unstaged_commit_state()?;
        let working = self.working_state()?;
        Ok(diff_states(&self.cache, &committed, &working))
    }

    pub fn has_uncommitted_changes(&self) -> SdkResult<bool> {
        Ok(self.working_state()? != self.get_unstaged_commit_state()?)
    }

    // ---- Commits ----

    /// Commit the working state on top of the head.
    pub fn commit(&self, message: &str) -> SdkResult<CommitData> {
        let user = self.require_user()?;
        let state = self.repo_state()?;
        if state.is_in_merge_conflict {
            warn!(repo_id = %self.repo_id, "refused commit during merge conflict");
            return Err(SdkError::InvalidOperation(
                "resolve or abort the merge in progress before committing".into(),
            ));
        }

        let parent = match &state.commit {
            Some(sha) => Some(self.read_commit(sha)?),
            None => None,
        };
        let committed = self.states().get_unstaged_commit_state(state.commit.as_ref())?;
        let working = self.working_state()?;
        let diff = diff_states(&self.cache, &committed, &working);
        if diff.is_empty() {
            return Err(SdkError::InvalidOperation("nothing to commit".into()));
        }

        let commit = create_commit(parent.as_ref(), diff, user, message, Utc::now())?;
        self.advance_head(&state, commit.sha, std::slice::from_ref(&commit), &working, &working)?;
        info!(
            repo_id = %self.repo_id,
            sha = %commit.sha.short_hex(),
            idx = commit.idx,
            "committed"
        );
        Ok(commit)
    }

    /// Move the checked-out head to `head` after persisting `new_commits`.
    ///
    /// Branch and bookkeeping records are read before the first write, so a
    /// failed read leaves the repository untouched.
    pub(crate) fn advance_head(
        &self,
        state: &RepoState,
        head: Sha,
        new_commits: &[CommitData],
        committed: &ApplicationKvState,
        working: &ApplicationKvState,
    ) -> SdkResult<()> {
        let branch = match &state.branch {
            Some(id) => Some(
                self.store
                    .read_branch(&self.repo_id, id)?
                    .ok_or_else(|| SdkError::BranchNotFound(id.clone()))?,
            ),
            None => None,
        };
        let mut meta = self
            .store
            .read_branches_meta_state(&self.repo_id)?
            .unwrap_or_default();

        for commit in new_commits {
            self.store.save_commit(&self.repo_id, commit)?;
        }
        self.states().set_hot_checkpoint(&head, committed)?;
        if let Some(mut branch) = branch {
            branch.first_commit.get_or_insert(head);
            branch.last_commit = Some(head);
            self.store.save_branch(&self.repo_id, &branch)?;
            meta.record(&branch.id, Some(head), false);
            self.store.save_branches_meta_state(&self.repo_id, &meta)?;
        }
        let next = RepoState {
            branch: state.branch.clone(),
            commit: Some(head),
            is_in_merge_conflict: false,
            merge: None,
        };
        self.store.save_current_repo_state(&self.repo_id, &next)?;
        self.store.save_current_state(&self.repo_id, working)?;
        Ok(())
    }

    /// History ending at `sha`, newest first.
    pub fn get_history(&self, sha: Option<&Sha>) -> SdkResult<Vec<CommitData>> {
        Ok(get_history(&self.store, &self.repo_id, sha)?)
    }

    /// History of the head, newest first.
    pub fn history(&self) -> SdkResult<Vec<CommitData>> {
        let head = self.head()?;
        self.get_history(head.as_ref())
    }

    pub fn log(&self, limit: usize) -> SdkResult<Vec<CommitSummary>> {
        Ok(self
            .history()?
            .iter()
            .take(limit)
            .map(CommitSummary::from)
            .collect())
    }

    // ---- Branches ----

    /// Create a branch at the head. The new branch is not checked out.
    pub fn create_branch(&self, name: &str) -> SdkResult<Branch> {
        let user = self.require_user()?;
        let state = self.repo_state()?;
        let branch = Branch::new(name, state.commit, state.branch.clone(), user, Utc::now())?;
        if self.store.read_branch(&self.repo_id, &branch.id)?.is_some() {
            return Err(SdkError::InvalidOperation(format!(
                "branch {} already exists",
                branch.id
            )));
        }
        let mut meta = self
            .store
            .read_branches_meta_state(&self.repo_id)?
            .unwrap_or_default();
        meta.record(&branch.id, state.commit, true);

        self.store.save_branch(&self.repo_id, &branch)?;
        self.store.save_branches_meta_state(&self.repo_id, &meta)?;
        info!(repo_id = %self.repo_id, branch = %branch.id, "created branch");
        Ok(branch)
    }

    /// Check out the head of a branch, by name or id.
    pub fn checkout_branch(&self, name: &str) -> SdkResult<RepoState> {
        let state = self.repo_state()?;
        self.ensure_clean(&state)?;
        let id = branch_id_from_name(name);
        let branch = self
            .store
            .read_branch(&self.repo_id, &id)?
            .ok_or_else(|| SdkError::BranchNotFound(name.to_string()))?;

        let committed = self
            .states()
            .get_unstaged_commit_state(branch.last_commit.as_ref())?;
        let next = RepoState::on_branch(branch.id.clone(), branch.last_commit);
        self.store.save_current_repo_state(&self.repo_id, &next)?;
        self.store.save_current_state(&self.repo_id, &committed)?;
        info!(repo_id = %self.repo_id, branch = %branch.id, "checked out branch");
        Ok(next)
    }

    /// Check out a single commit with a detached head.
    pub fn checkout_commit(&self, sha: &Sha) -> SdkResult<RepoState> {
        let state = self.repo_state()?;
        self.ensure_clean(&state)?;
        self.read_commit(sha)?;

        let committed = self.states().get_unstaged_commit_state(Some(sha))?;
        let next = RepoState {
            commit: Some(*sha),
            ..RepoState::default()
        };
        self.store.save_current_repo_state(&self.repo_id, &next)?;
        self.store.save_current_state(&self.repo_id, &committed)?;
        info!(repo_id = %self.repo_id, sha = %sha.short_hex(), "checked out commit");
        Ok(next)
    }

    pub fn list_branches(&self) -> SdkResult<Vec<Branch>> {
        Ok(self.store.list_branches(&self.repo_id)?)
    }

    fn ensure_clean(&self, state: &RepoState) -> SdkResult<()> {
        if state.is_in_merge_conflict {
            return Err(SdkError::InvalidOperation(
                "resolve or abort the merge in progress first".into(),
            ));
        }
        if self.has_uncommitted_changes()? {
            return Err(SdkError::InvalidOperation(
                "commit or discard uncommitted changes first".into(),
            ));
        }
        Ok(())
    }

    // ---- Provenance queries ----

    /// The commit graph with branch lineage and current-commit flags.
    pub fn source_graph(&self) -> SdkResult<SourceGraph> {
        let state = self.repo_state()?;
        let commits = self.store.list_commits(&self.repo_id)?;
        let branches = self.store.list_branches(&self.repo_id)?;
        let meta = self
            .store
            .read_branches_meta_state(&self.repo_id)?
            .unwrap_or_default();
        Ok(SourceGraph::from_parts(
            commits,
            &branches,
            &meta,
            state.commit.as_ref(),
        )?)
    }

    /// Commits no branch head reaches, oldest first. These include target
    /// commits a merge replaced with rebased copies, and commits made on a
    /// detached head.
    pub fn detached_commits(&self) -> SdkResult<Vec<CommitSummary>> {
        let graph = self.source_graph()?;
        Ok(graph
            .detached()
            .into_iter()
            .map(|node| CommitSummary::from(&node.commit))
            .collect())
    }

    /// Whether the checkpointed state at `sha` equals a full replay.
    pub fn verify_replay(&self, sha: &Sha) -> SdkResult<bool> {
        Ok(self.states().verify_replay(sha)?)
    }

    /// Check sha, idx and parent integrity of the head's history.
    pub fn validate_history(&self) -> SdkResult<ValidationReport> {
        let head = self.head()?;
        Ok(ChainValidator::validate_chain(
            &self.store,
            &self.repo_id,
            head.as_ref(),
        )?)
    }
}
