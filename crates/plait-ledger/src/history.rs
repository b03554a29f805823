//! Walking commit history.
//!
//! All walks iterate over parent links with an explicit loop, so history
//! length is bounded only by memory.

use std::collections::HashSet;

use plait_store::RepoStore;
use plait_types::{CommitData, Sha};

use crate::error::{LedgerError, LedgerResult};

/// Read a commit, turning a store miss into [`LedgerError::CommitNotFound`].
pub fn read_commit<S: RepoStore + ?Sized>(
    store: &S,
    repo_id: &str,
    sha: &Sha,
) -> LedgerResult<CommitData> {
    store
        .read_commit(repo_id, sha)?
        .ok_or(LedgerError::CommitNotFound(*sha))
}

/// The history ending at `sha`, newest first. `None` yields an empty history.
pub fn get_history<S: RepoStore + ?Sized>(
    store: &S,
    repo_id: &str,
    sha: Option<&Sha>,
) -> LedgerResult<Vec<CommitData>> {
    let mut history = Vec::new();
    let mut next = sha.copied();
    while let Some(current) = next {
        let commit = read_commit(store, repo_id, &current)?;
        next = commit.parent;
        history.push(commit);
    }
    Ok(history)
}

/// The most recent commit shared by two newest-first histories.
///
/// The longer history is walked against the shas of the shorter one.
pub fn divergence_origin(a: &[CommitData], b: &[CommitData]) -> Option<Sha> {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let seen: HashSet<Sha> = shorter.iter().map(|c| c.sha).collect();
    longer.iter().map(|c| c.sha).find(|sha| seen.contains(sha))
}

/// Commits of a newest-first `history` that come after `origin`, oldest first.
///
/// With no origin the whole history is returned.
pub fn commits_after(history: &[CommitData], origin: Option<&Sha>) -> Vec<CommitData> {
    let mut trailing: Vec<CommitData> = history
        .iter()
        .take_while(|commit| Some(&commit.sha) != origin)
        .cloned()
        .collect();
    trailing.reverse();
    trailing
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use plait_store::InMemoryRepoStore;
    use plait_types::StateDiff;

    use crate::commit::create_commit;

    const REPO: &str = "repo";

    fn chain(
        store: &InMemoryRepoStore,
        parent: Option<&CommitData>,
        n: usize,
        tag: &str,
    ) -> Vec<CommitData> {
        let mut commits = Vec::new();
        let mut parent = parent.cloned();
        for i in 0..n {
            let timestamp = Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap();
            let message = format!("{tag} {i}");
            let commit =
                create_commit(parent.as_ref(), StateDiff::new(), "ada", &message, timestamp)
                    .unwrap();
            store.save_commit(REPO, &commit).unwrap();
            parent = Some(commit.clone());
            commits.push(commit);
        }
        commits
    }

    #[test]
    fn history_is_newest_first() {
        let store = InMemoryRepoStore::new();
        let commits = chain(&store, None, 4, "main");
        let history = get_history(&store, REPO, Some(&commits[3].sha)).unwrap();
        let idxs: Vec<u64> = history.iter().map(|c| c.idx).collect();
        assert_eq!(idxs, vec![3, 2, 1, 0]);
        assert!(get_history(&store, REPO, None).unwrap().is_empty());
    }

    #[test]
    fn missing_commit_is_not_found() {
        let store = InMemoryRepoStore::new();
        let sha = Sha::from_hash([4; 32]);
        assert!(matches!(
            get_history(&store, REPO, Some(&sha)),
            Err(LedgerError::CommitNotFound(s)) if s == sha
        ));
    }

    #[test]
    fn long_history_does_not_recurse() {
        let store = InMemoryRepoStore::new();
        let commits = chain(&store, None, 2_000, "long");
        let history = get_history(&store, REPO, Some(&commits[1_999].sha)).unwrap();
        assert_eq!(history.len(), 2_000);
    }

    #[test]
    fn divergence_origin_finds_fork_point() {
        let store = InMemoryRepoStore::new();
        let base = chain(&store, None, 3, "base");
        let left = chain(&store, Some(&base[2]), 2, "left");
        let right = chain(&store, Some(&base[2]), 5, "right");

        let left_history = get_history(&store, REPO, Some(&left[1].sha)).unwrap();
        let right_history = get_history(&store, REPO, Some(&right[4].sha)).unwrap();
        assert_eq!(divergence_origin(&left_history, &right_history), Some(base[2].sha));
        assert_eq!(divergence_origin(&right_history, &left_history), Some(base[2].sha));

        let trailing = commits_after(&right_history, Some(&base[2].sha));
        assert_eq!(trailing.len(), 5);
        assert_eq!(trailing[0].sha, right[0].sha);
    }

    #[test]
    fn unrelated_histories_have_no_origin() {
        let store = InMemoryRepoStore::new();
        let a = chain(&store, None, 2, "a");
        let b = chain(&store, None, 2, "b");
        let a_history = get_history(&store, REPO, Some(&a[1].sha)).unwrap();
        let b_history = get_history(&store, REPO, Some(&b[1].sha)).unwrap();
        assert_eq!(divergence_origin(&a_history, &b_history), None);
        assert_eq!(commits_after(&b_history, None).len(), 2);
    }
}
