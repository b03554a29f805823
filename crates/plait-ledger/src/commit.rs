//! Commit construction and content shas.
//!
//! A commit's sha is the `plait-commit-v1` hash of every other field, so two
//! commits with the same parent, diff, author, message and timestamp always
//! share a sha, and rewriting any of them (as a rebase does) yields a new one.

use chrono::{DateTime, Utc};
use plait_crypto::ContentHasher;
use plait_types::{CommitData, Sha, StateDiff};
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};

/// The hashed fields of a commit, in a fixed order.
#[derive(Serialize)]
struct ShaInput<'a> {
    parent: Option<&'a Sha>,
    historical_parent: Option<&'a Sha>,
    idx: u64,
    diff: &'a StateDiff,
    user_id: &'a str,
    message: &'a str,
    timestamp: &'a DateTime<Utc>,
    merge_base: Option<&'a Sha>,
}

/// Compute the content sha of `commit`, ignoring its current `sha` field.
pub fn compute_sha(commit: &CommitData) -> LedgerResult<Sha> {
    let input = ShaInput {
        parent: commit.parent.as_ref(),
        historical_parent: commit.historical_parent.as_ref(),
        idx: commit.idx,
        diff: &commit.diff,
        user_id: &commit.user_id,
        message: &commit.message,
        timestamp: &commit.timestamp,
        merge_base: commit.merge_base.as_ref(),
    };
    let digest = ContentHasher::COMMIT
        .hash_json(&input)
        .map_err(|e| LedgerError::Serialization(e.to_string()))?;
    Ok(Sha::from_hash(digest))
}

/// Recompute and store the sha of `commit`.
pub fn seal(mut commit: CommitData) -> LedgerResult<CommitData> {
    commit.sha = compute_sha(&commit)?;
    Ok(commit)
}

/// Check that `commit.sha` is its content hash.
pub fn verify_sha(commit: &CommitData) -> LedgerResult<()> {
    let computed = compute_sha(commit)?;
    if computed != commit.sha {
        return Err(LedgerError::ShaMismatch {
            sha: commit.sha,
            computed,
        });
    }
    Ok(())
}

/// Build a new commit on top of `parent` (or a root commit when `None`).
pub fn create_commit(
    parent: Option<&CommitData>,
    diff: StateDiff,
    user_id: &str,
    message: &str,
    timestamp: DateTime<Utc>,
) -> LedgerResult<CommitData> {
    let parent_sha = parent.map(|p| p.sha);
    seal(CommitData {
        sha: Sha::from_hash([0; 32]),
        parent: parent_sha,
        historical_parent: parent_sha,
        idx: parent.map_or(0, |p| p.idx + 1),
        diff,
        user_id: user_id.to_string(),
        message: message.to_string(),
        timestamp,
        merge_base: None,
    })
}

/// Re-parent `commit` onto `onto` with a new diff.
///
/// Author, message and timestamp are preserved; `historical_parent` records
/// the commit this one was rebased from.
pub fn rebase_commit(
    commit: &CommitData,
    onto: &CommitData,
    diff: StateDiff,
) -> LedgerResult<CommitData> {
    seal(CommitData {
        sha: commit.sha,
        parent: Some(onto.sha),
        historical_parent: Some(commit.sha),
        idx: onto.idx + 1,
        diff,
        user_id: commit.user_id.clone(),
        message: commit.message.clone(),
        timestamp: commit.timestamp,
        merge_base: commit.merge_base,
    })
}

/// Build the base commit of a non-fast-forward merge.
///
/// The base sits directly on `origin` (or is a root when the histories
/// share nothing) and carries the source branch's changes; its
/// `historical_parent` is the source commit.
pub fn create_merge_base(
    origin: Option<&CommitData>,
    from: &CommitData,
    diff: StateDiff,
    user_id: &str,
    message: &str,
    timestamp: DateTime<Utc>,
) -> LedgerResult<CommitData> {
    seal(CommitData {
        sha: Sha::from_hash([0; 32]),
        parent: origin.map(|o| o.sha),
        historical_parent: Some(from.sha),
        idx: origin.map_or(0, |o| o.idx + 1),
        diff,
        user_id: user_id.to_string(),
        message: message.to_string(),
        timestamp,
        merge_base: None,
    })
}

/// Build the commit that closes a merge on top of the rebased `tip`.
///
/// `historical_parent` is the target head the merge started from.
pub fn create_merge_commit(
    tip: &CommitData,
    into: Option<&Sha>,
    base: &CommitData,
    diff: StateDiff,
    user_id: &str,
    message: &str,
    timestamp: DateTime<Utc>,
) -> LedgerResult<CommitData> {
    seal(CommitData {
        sha: Sha::from_hash([0; 32]),
        parent: Some(tip.sha),
        historical_parent: into.copied(),
        idx: tip.idx + 1,
        diff,
        user_id: user_id.to_string(),
        message: message.to_string(),
        timestamp,
        merge_base: Some(base.sha),
    })
}
