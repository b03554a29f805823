//! Commit state reconstruction.
//!
//! A commit stores only the diff from its parent, so its full state is
//! rebuilt by replaying diffs forward from the nearest known state: the hot
//! checkpoint, a persisted checkpoint, or the empty root state. Checkpoints
//! are written as a side effect of replay every `interval` commits, but only
//! for commits old enough that they are unlikely to be rebased.

use plait_diff::apply_state_diff;
use plait_store::RepoStore;
use plait_types::{ApplicationKvState, CommitData, HotCheckpoint, Sha};
use tracing::{debug, trace};

use crate::error::{LedgerError, LedgerResult};
use crate::history::read_commit;

/// When replay persists checkpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckpointPolicy {
    /// Checkpoint every commit whose idx is a positive multiple of this.
    pub interval: u64,
    /// Minimum idx distance between a checkpointed commit and the commit
    /// being materialized.
    pub min_age: u64,
}

impl CheckpointPolicy {
    pub const DEFAULT_INTERVAL: u64 = 50;

    /// Whether a commit at `idx` may carry a checkpoint.
    pub fn is_boundary(&self, idx: u64) -> bool {
        self.interval > 0 && idx > 0 && idx % self.interval == 0
    }

    /// Whether replay towards `target_idx` should persist a checkpoint at `idx`.
    pub fn should_persist(&self, idx: u64, target_idx: u64) -> bool {
        self.is_boundary(idx) && target_idx.saturating_sub(idx) >= self.min_age
    }
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            min_age: Self::DEFAULT_INTERVAL,
        }
    }
}

/// Materializes commit states for one repository.
pub struct CommitStateStore<'a, S: RepoStore + ?Sized> {
    store: &'a S,
    repo_id: &'a str,
    policy: CheckpointPolicy,
}

impl<'a, S: RepoStore + ?Sized> CommitStateStore<'a, S> {
    pub fn new(store: &'a S, repo_id: &'a str, policy: CheckpointPolicy) -> Self {
        Self {
            store,
            repo_id,
            policy,
        }
    }

    pub fn policy(&self) -> CheckpointPolicy {
        self.policy
    }

    /// The state at `sha`. `None` is the empty state of a repository with
    /// no commits.
    pub fn get_commit_state(&self, sha: Option<&Sha>) -> LedgerResult<ApplicationKvState> {
        match sha {
            None => Ok(ApplicationKvState::empty()),
            Some(sha) => self.materialize(sha, true),
        }
    }

    /// The state at `sha` replayed from the root, ignoring every checkpoint.
    pub fn full_replay(&self, sha: &Sha) -> LedgerResult<ApplicationKvState> {
        self.materialize(sha, false)
    }

    /// Whether the checkpointed state at `sha` equals its full replay.
    pub fn verify_replay(&self, sha: &Sha) -> LedgerResult<bool> {
        let shortcut = self.materialize(sha, true)?;
        let full = self.full_replay(sha)?;
        if shortcut != full {
            debug!(repo_id = self.repo_id, sha = %sha.short_hex(), "replay mismatch");
        }
        Ok(shortcut == full)
    }

    /// The committed state of `head`, served from and stored into the hot
    /// checkpoint slot.
    pub fn get_unstaged_commit_state(
        &self,
        head: Option<&Sha>,
    ) -> LedgerResult<ApplicationKvState> {
        let Some(head) = head else {
            return Ok(ApplicationKvState::empty());
        };
        if let Some(hot) = self.store.read_hot_checkpoint(self.repo_id)? {
            if hot.sha == *head {
                return Ok(hot.state);
            }
        }
        let state = self.materialize(head, true)?;
        self.set_hot_checkpoint(head, &state)?;
        Ok(state)
    }

    /// Replace the hot checkpoint with the known state of `sha`.
    pub fn set_hot_checkpoint(&self, sha: &Sha, state: &ApplicationKvState) -> LedgerResult<()> {
        trace!(repo_id = self.repo_id, sha = %sha.short_hex(), "hot checkpoint");
        self.store.save_hot_checkpoint(
            self.repo_id,
            &HotCheckpoint {
                sha: *sha,
                state: state.clone(),
            },
        )?;
        Ok(())
    }

    fn materialize(&self, sha: &Sha, shortcuts: bool) -> LedgerResult<ApplicationKvState> {
        let hot = if shortcuts {
            self.store.read_hot_checkpoint(self.repo_id)?
        } else {
            None
        };

        // Walk back until a known state, collecting commits newest first.
        let mut pending: Vec<CommitData> = Vec::new();
        let mut base = ApplicationKvState::empty();
        let mut next = Some(*sha);
        while let Some(current) = next {
            if let Some(hot) = hot.as_ref().filter(|hot| hot.sha == current) {
                base = hot.state.clone();
                break;
            }
            let commit = read_commit(self.store, self.repo_id, &current)?;
            if let Some(newer) = pending.last() {
                check_idx(newer, &commit)?;
            }
            if shortcuts && self.policy.is_boundary(commit.idx) {
                if let Some(state) = self.store.read_checkpoint(self.repo_id, &current)? {
                    base = state;
                    break;
                }
            }
            if commit.parent.is_none() && commit.idx != 0 {
                return Err(LedgerError::IndexGap {
                    sha: commit.sha,
                    expected: 0,
                    found: commit.idx,
                });
            }
            next = commit.parent;
            pending.push(commit);
        }

        let Some(target_idx) = pending.first().map(|c| c.idx) else {
            return Ok(base);
        };
        trace!(
            repo_id = self.repo_id,
            sha = %sha.short_hex(),
            replayed = pending.len(),
            "replaying commit diffs"
        );

        let mut state = base;
        for commit in pending.iter().rev() {
            state = apply_state_diff(&commit.diff, &state).map_err(|source| {
                LedgerError::Replay {
                    sha: commit.sha,
                    source,
                }
            })?;
            if shortcuts && self.policy.should_persist(commit.idx, target_idx) {
                debug!(
                    repo_id = self.repo_id,
                    sha = %commit.sha.short_hex(),
                    idx = commit.idx,
                    "persisting checkpoint"
                );
                self.store.save_checkpoint(self.repo_id, &commit.sha, &state)?;
            }
        }
        Ok(state)
    }
}

fn check_idx(child: &CommitData, parent: &CommitData) -> LedgerResult<()> {
    if child.idx != parent.idx + 1 {
        return Err(LedgerError::IndexGap {
            sha: child.sha,
            expected: parent.idx + 1,
            found: child.idx,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use plait_diff::{diff_states, LcsCache};
    use plait_store::InMemoryRepoStore;
    use plait_types::DiffElement;
    use serde_json::json;

    use crate::commit::{create_commit, seal};

    const REPO: &str = "repo";

    /// Build a linear history of `len` commits; returns each commit with
    /// the state it produces.
    fn build_chain(store: &InMemoryRepoStore, len: usize) -> Vec<(CommitData, ApplicationKvState)> {
        let cache = LcsCache::default();
        let mut out: Vec<(CommitData, ApplicationKvState)> = Vec::new();
        let mut state = ApplicationKvState::empty();
        for i in 0..len {
            let mut next = state.clone();
            next.set_plugin_store(
                "counter",
                vec![DiffElement::new("$(counter).value", json!(i))],
            );
            if i % 7 == 0 {
                next.description.push(format!("line {i}"));
            }
            if i % 11 == 5 {
                next.description.remove(0);
            }
            let diff = diff_states(&cache, &state, &next);
            let timestamp = Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap();
            let parent = out.last().map(|(c, _)| c);
            let commit = create_commit(parent, diff, "ada", &format!("c{i}"), timestamp).unwrap();
            store.save_commit(REPO, &commit).unwrap();
            state = next;
            out.push((commit, state.clone()));
        }
        out
    }

    #[test]
    fn null_sha_is_empty_state() {
        let store = InMemoryRepoStore::new();
        let states = CommitStateStore::new(&store, REPO, CheckpointPolicy::default());
        assert_eq!(states.get_commit_state(None).unwrap(), ApplicationKvState::empty());
    }

    #[test]
    fn replay_reproduces_every_state() {
        let store = InMemoryRepoStore::new();
        let chain = build_chain(&store, 30);
        let states = CommitStateStore::new(&store, REPO, CheckpointPolicy::default());
        for (commit, expected) in &chain {
            assert_eq!(&states.get_commit_state(Some(&commit.sha)).unwrap(), expected);
        }
        assert_eq!(store.checkpoint_count(REPO), 0);
    }

    #[test]
    fn checkpoints_only_old_boundaries() {
        let store = InMemoryRepoStore::new();
        let chain = build_chain(&store, 120);
        let states = CommitStateStore::new(&store, REPO, CheckpointPolicy::default());

        let (head, expected) = &chain[119];
        assert_eq!(&states.get_commit_state(Some(&head.sha)).unwrap(), expected);
        // idx 100 is too close to the head at 119.
        assert_eq!(store.checkpoint_shas(REPO), vec![chain[50].0.sha]);
        assert_eq!(
            store.read_checkpoint(REPO, &chain[50].0.sha).unwrap().as_ref(),
            Some(&chain[50].1)
        );
    }

    #[test]
    fn checkpoint_shortcut_matches_full_replay() {
        let store = InMemoryRepoStore::new();
        let chain = build_chain(&store, 160);
        let states = CommitStateStore::new(&store, REPO, CheckpointPolicy::default());
        states.get_commit_state(Some(&chain[159].0.sha)).unwrap();
        assert_eq!(store.checkpoint_count(REPO), 2);

        for idx in [0, 1, 49, 50, 51, 99, 100, 101, 150, 159] {
            let (commit, expected) = &chain[idx];
            assert!(states.verify_replay(&commit.sha).unwrap(), "idx {idx}");
            assert_eq!(&states.full_replay(&commit.sha).unwrap(), expected);
            assert_eq!(&states.get_commit_state(Some(&commit.sha)).unwrap(), expected);
        }
    }

    #[test]
    fn persisted_checkpoint_is_used() {
        let store = InMemoryRepoStore::new();
        let chain = build_chain(&store, 60);
        let policy = CheckpointPolicy {
            interval: 50,
            min_age: 0,
        };
        let states = CommitStateStore::new(&store, REPO, policy);

        // A planted checkpoint shows up in every descendant's state.
        let mut planted = chain[50].1.clone();
        planted.binaries.push("marker".into());
        store.save_checkpoint(REPO, &chain[50].0.sha, &planted).unwrap();

        let state = states.get_commit_state(Some(&chain[55].0.sha)).unwrap();
        assert_eq!(state.binaries, vec!["marker".to_string()]);
        assert!(!states.verify_replay(&chain[55].0.sha).unwrap());
    }

    #[test]
    fn hot_checkpoint_serves_exact_match() {
        let store = InMemoryRepoStore::new();
        let chain = build_chain(&store, 5);
        let states = CommitStateStore::new(&store, REPO, CheckpointPolicy::default());

        let head = &chain[4].0.sha;
        let state = states.get_unstaged_commit_state(Some(head)).unwrap();
        assert_eq!(state, chain[4].1);
        let hot = store.read_hot_checkpoint(REPO).unwrap().unwrap();
        assert_eq!(hot.sha, *head);
        assert_eq!(hot.state, chain[4].1);

        assert_eq!(
            states.get_unstaged_commit_state(None).unwrap(),
            ApplicationKvState::empty()
        );
    }

    #[test]
    fn replay_starts_from_hot_ancestor() {
        let store = InMemoryRepoStore::new();
        let chain = build_chain(&store, 10);
        let states = CommitStateStore::new(&store, REPO, CheckpointPolicy::default());
        states.set_hot_checkpoint(&chain[6].0.sha, &chain[6].1).unwrap();
        assert_eq!(states.get_commit_state(Some(&chain[9].0.sha)).unwrap(), chain[9].1);
    }

    #[test]
    fn idx_gap_is_corruption() {
        let store = InMemoryRepoStore::new();
        let chain = build_chain(&store, 3);
        let mut broken = chain[2].0.clone();
        broken.parent = Some(chain[0].0.sha);
        let broken = seal(broken).unwrap();
        store.save_commit(REPO, &broken).unwrap();

        let states = CommitStateStore::new(&store, REPO, CheckpointPolicy::default());
        assert!(matches!(
            states.get_commit_state(Some(&broken.sha)),
            Err(LedgerError::IndexGap { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn missing_parent_is_not_found() {
        let store = InMemoryRepoStore::new();
        let chain = build_chain(&store, 2);
        let mut orphan = chain[1].0.clone();
        orphan.parent = Some(Sha::from_hash([0xee; 32]));
        let orphan = seal(orphan).unwrap();
        store.save_commit(REPO, &orphan).unwrap();

        let states = CommitStateStore::new(&store, REPO, CheckpointPolicy::default());
        assert!(matches!(
            states.get_commit_state(Some(&orphan.sha)),
            Err(LedgerError::CommitNotFound(_))
        ));
    }

    #[test]
    fn policy_boundaries() {
        let policy = CheckpointPolicy::default();
        assert!(!policy.is_boundary(0));
        assert!(policy.is_boundary(50));
        assert!(!policy.is_boundary(51));
        assert!(policy.should_persist(50, 100));
        assert!(!policy.should_persist(50, 99));
        assert!(!policy.should_persist(50, 10));
    }
}
