//! Branches, branch bookkeeping and the repository's checked-out state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::sha::Sha;

/// Characters that are forbidden anywhere in a branch name.
const FORBIDDEN_CHARS: &[char] = &['~', '^', ':', '?', '*', '[', '\\', '/'];

/// A named, movable pointer into the commit history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Stable identifier derived from the name, see [`branch_id_from_name`].
    pub id: String,
    pub name: String,
    pub first_commit: Option<Sha>,
    pub last_commit: Option<Sha>,
    /// The branch this one was created from, if any.
    pub base_branch_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(
        name: &str,
        head: Option<Sha>,
        base_branch_id: Option<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TypeError> {
        validate_branch_name(name)?;
        Ok(Self {
            id: branch_id_from_name(name),
            name: name.to_string(),
            first_commit: head,
            last_commit: head,
            base_branch_id,
            created_by: created_by.into(),
            created_at,
        })
    }
}

/// Derive a branch id: lowercased, with whitespace runs collapsed to `-`.
pub fn branch_id_from_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Validate a human-readable branch name.
///
/// Names may contain spaces (the id normalizes them) but must be non-empty
/// after trimming, carry no surrounding whitespace, no control characters,
/// no `..` and none of [`FORBIDDEN_CHARS`].
pub fn validate_branch_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidBranchName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("branch name must not be empty"));
    }
    if name.trim() != name {
        return Err(invalid("must not start or end with whitespace"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(&format!("contains forbidden character: {ch:?}")));
    }
    if name.contains("..") {
        return Err(invalid("must not contain '..'"));
    }
    Ok(())
}

/// Last-known local head of one branch, as tracked in [`BranchesMetaState`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchMeta {
    pub branch_id: String,
    pub last_local_commit: Option<Sha>,
}

/// Bookkeeping of every branch and of the branches the local user owns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchesMetaState {
    pub all_branches: Vec<BranchMeta>,
    pub user_branches: Vec<BranchMeta>,
}

impl BranchesMetaState {
    /// Record `head` as the last local commit of `branch_id`, inserting the
    /// branch if unknown. `owned` also tracks it as a user branch.
    pub fn record(&mut self, branch_id: &str, head: Option<Sha>, owned: bool) {
        upsert(&mut self.all_branches, branch_id, head);
        if owned || self.user_branches.iter().any(|b| b.branch_id == branch_id) {
            upsert(&mut self.user_branches, branch_id, head);
        }
    }

    pub fn is_user_branch(&self, branch_id: &str) -> bool {
        self.user_branches.iter().any(|b| b.branch_id == branch_id)
    }
}

fn upsert(list: &mut Vec<BranchMeta>, branch_id: &str, head: Option<Sha>) {
    match list.iter_mut().find(|b| b.branch_id == branch_id) {
        Some(meta) => meta.last_local_commit = head,
        None => list.push(BranchMeta {
            branch_id: branch_id.to_string(),
            last_local_commit: head,
        }),
    }
}

/// Which side comes first when a merge segment cannot be reconciled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeDirection {
    /// Content of the `from` side comes first.
    #[default]
    Yours,
    /// Content of the `into` side comes first.
    Theirs,
}

impl MergeDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Yours => Self::Theirs,
            Self::Theirs => Self::Yours,
        }
    }
}

impl fmt::Display for MergeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yours => write!(f, "yours"),
            Self::Theirs => write!(f, "theirs"),
        }
    }
}

/// An in-progress, conflicted merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeState {
    pub from_sha: Sha,
    pub into_sha: Option<Sha>,
    pub origin_sha: Option<Sha>,
    pub direction: MergeDirection,
}

/// What the repository currently has checked out.
///
/// `branch` is a branch id, or `None` when the head is detached.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoState {
    pub branch: Option<String>,
    pub commit: Option<Sha>,
    pub is_in_merge_conflict: bool,
    pub merge: Option<MergeState>,
}

impl RepoState {
    pub fn on_branch(branch_id: impl Into<String>, commit: Option<Sha>) -> Self {
        Self {
            branch: Some(branch_id.into()),
            commit,
            is_in_merge_conflict: false,
            merge: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_id_normalizes_whitespace_and_case() {
        assert_eq!(branch_id_from_name("Main"), "main");
        assert_eq!(branch_id_from_name("My  New\tFeature"), "my-new-feature");
    }

    #[test]
    fn valid_names() {
        assert!(validate_branch_name("main").is_ok());
        assert!(validate_branch_name("color palette v2").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name("   ").is_err());
        assert!(validate_branch_name(" main").is_err());
        assert!(validate_branch_name("a..b").is_err());
        assert!(validate_branch_name("feat/x").is_err());
        assert!(validate_branch_name("bad\nname").is_err());
    }

    #[test]
    fn new_branch_points_at_head() {
        let head = Some(Sha::from_hash([3; 32]));
        let branch = Branch::new("Feature One", head, Some("main".into()), "user-1", Utc::now())
            .unwrap();
        assert_eq!(branch.id, "feature-one");
        assert_eq!(branch.first_commit, head);
        assert_eq!(branch.last_commit, head);
    }

    #[test]
    fn meta_state_tracks_user_branches() {
        let mut meta = BranchesMetaState::default();
        let sha = Some(Sha::from_hash([1; 32]));
        meta.record("main", None, false);
        meta.record("mine", sha, true);
        meta.record("main", sha, false);

        assert_eq!(meta.all_branches.len(), 2);
        assert_eq!(meta.all_branches[0].last_local_commit, sha);
        assert!(meta.is_user_branch("mine"));
        assert!(!meta.is_user_branch("main"));

        meta.record("mine", None, false);
        assert_eq!(meta.user_branches[0].last_local_commit, None);
    }

    #[test]
    fn direction_serializes_lowercase() {
        let json = serde_json::to_string(&MergeDirection::Theirs).unwrap();
        assert_eq!(json, "\"theirs\"");
        assert_eq!(MergeDirection::Yours.opposite(), MergeDirection::Theirs);
    }
}
