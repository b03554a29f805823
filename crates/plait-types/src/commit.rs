use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sha::Sha;
use crate::state::StateDiff;

/// A commit in a repository's history.
///
/// `idx` is the distance from the root: a root commit has idx 0 and every
/// child has its parent's idx plus one. `historical_parent` records where a
/// rebased or synthesized commit came from; it never participates in state
/// reconstruction, only `parent` does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitData {
    pub sha: Sha,
    pub parent: Option<Sha>,
    pub historical_parent: Option<Sha>,
    pub idx: u64,
    pub diff: StateDiff,
    pub user_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Set on merge commits: the synthesized base the merge was built on.
    pub merge_base: Option<Sha>,
}

impl CommitData {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_merge(&self) -> bool {
        self.merge_base.is_some()
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!("{} idx={} {:?}", self.sha.short_hex(), self.idx, self.message)
    }
}
