use chrono::{DateTime, Utc};
use plait_types::{CommitData, Sha};
use serde::{Deserialize, Serialize};

/// One line of a history listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: Sha,
    pub idx: u64,
    pub message: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    /// Number of add/remove entries in the commit's diff.
    pub changes: usize,
    /// The commit closes a merge (it carries a merge base).
    pub is_merge: bool,
    /// The commit was rewritten by a rebase; `historical_parent` differs
    /// from `parent`.
    pub is_rebased: bool,
}

impl From<&CommitData> for CommitSummary {
    fn from(commit: &CommitData) -> Self {
        Self {
            sha: commit.sha,
            idx: commit.idx,
            message: commit.message.clone(),
            user_id: commit.user_id.clone(),
            timestamp: commit.timestamp,
            changes: commit.diff.change_count(),
            is_merge: commit.is_merge(),
            is_rebased: commit.historical_parent != commit.parent,
        }
    }
}

/// Result of [`Repository::merge_commit`](crate::Repository::merge_commit)
/// and [`Repository::resolve_merge`](crate::Repository::resolve_merge).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub status: MergeStatus,
    /// The checked-out commit after the operation.
    pub head: Option<Sha>,
    /// The divergence origin of the two histories.
    pub origin: Option<Sha>,
    /// The synthesized base commit, for non-fast-forward merges.
    pub merge_base: Option<Sha>,
    /// Shas of the rebased target commits, oldest first.
    pub rebased: Vec<Sha>,
    /// Namespaces that could not be merged automatically.
    pub conflicts: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    /// The head moved forward to the source commit.
    FastForward,
    /// A merge commit was appended on top of the rebased target commits.
    Merged,
    /// The merge needs a manual resolution; nothing was committed.
    Conflicted,
}
