//! Graph nodes: a commit plus the lineage flags the graph computes for it.

use serde::{Deserialize, Serialize};

use plait_types::{CommitData, Sha};

/// A commit in the [`SourceGraph`](crate::SourceGraph).
///
/// The flags are derived once when the graph is built, so per-commit
/// queries never walk history again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCommitNode {
    pub commit: CommitData,
    /// Shas of commits whose parent is this one, oldest first.
    pub children: Vec<Sha>,
    /// Ids of branches whose head is this commit, sorted.
    pub branch_ids: Vec<String>,
    /// Reachable from the head of some branch.
    pub is_in_branch_lineage: bool,
    /// Reachable from the head of a branch the current user owns.
    pub is_in_user_branch_lineage: bool,
    /// This commit is the repository's checked-out commit.
    pub is_current: bool,
}

impl SourceCommitNode {
    pub fn new(commit: CommitData) -> Self {
        Self {
            commit,
            children: Vec::new(),
            branch_ids: Vec::new(),
            is_in_branch_lineage: false,
            is_in_user_branch_lineage: false,
            is_current: false,
        }
    }

    pub fn sha(&self) -> Sha {
        self.commit.sha
    }

    /// Returns `true` if this is a root commit (idx 0).
    pub fn is_root(&self) -> bool {
        self.commit.parent.is_none()
    }

    /// Returns `true` if history forks at this commit.
    pub fn is_fork(&self) -> bool {
        self.children.len() > 1
    }

    /// Returns `true` if no commit builds on this one.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns a human-readable summary of this node.
    pub fn summary(&self) -> String {
        let mut summary = self.commit.summary();
        if !self.branch_ids.is_empty() {
            summary.push_str(&format!(" [{}]", self.branch_ids.join(", ")));
        }
        if self.is_current {
            summary.push_str(" (current)");
        }
        summary
    }
}
