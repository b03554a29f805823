use std::collections::HashSet;

use plait_store::RepoStore;
use plait_types::Sha;

use crate::commit::compute_sha;
use crate::error::LedgerResult;

/// Result of validating one commit chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub head: Option<Sha>,
    pub commit_count: u64,
    pub shas_valid: bool,
    pub idx_contiguous: bool,
    pub parents_present: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub sha: Sha,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    ShaMismatch,
    IndexGap,
    MissingParent,
    Cycle,
}

/// Commit chain integrity validator.
pub struct ChainValidator;

impl ChainValidator {
    /// Walk from `head` to the root and check every commit's sha, idx and
    /// parent link. Violations are collected rather than returned as errors;
    /// only storage failures abort the walk.
    pub fn validate_chain<S: RepoStore + ?Sized>(
        store: &S,
        repo_id: &str,
        head: Option<&Sha>,
    ) -> LedgerResult<ValidationReport> {
        let mut violations = Vec::new();
        let mut shas_valid = true;
        let mut idx_contiguous = true;
        let mut parents_present = true;
        let mut commit_count = 0u64;
        let mut visited = HashSet::new();

        let mut child_idx: Option<(Sha, u64)> = None;
        let mut next = head.copied();
        while let Some(current) = next {
            if !visited.insert(current) {
                violations.push(Violation {
                    sha: current,
                    kind: ViolationKind::Cycle,
                    description: "parent chain revisits a commit".into(),
                });
                break;
            }
            let Some(commit) = store.read_commit(repo_id, &current)? else {
                parents_present = false;
                violations.push(Violation {
                    sha: current,
                    kind: ViolationKind::MissingParent,
                    description: match child_idx {
                        Some((child, _)) => format!("parent of {} is missing", child.short_hex()),
                        None => "head commit is missing".into(),
                    },
                });
                break;
            };
            commit_count += 1;

            if compute_sha(&commit)? != commit.sha {
                shas_valid = false;
                violations.push(Violation {
                    sha: commit.sha,
                    kind: ViolationKind::ShaMismatch,
                    description: "commit sha does not match computed content hash".into(),
                });
            }

            let expected_idx = match child_idx {
                Some((_, idx)) => idx.checked_sub(1),
                None => None,
            };
            if let Some(expected) = expected_idx {
                if commit.idx != expected {
                    idx_contiguous = false;
                    violations.push(Violation {
                        sha: commit.sha,
                        kind: ViolationKind::IndexGap,
                        description: format!("expected idx {expected}, got {}", commit.idx),
                    });
                }
            }
            if commit.parent.is_none() && commit.idx != 0 {
                idx_contiguous = false;
                violations.push(Violation {
                    sha: commit.sha,
                    kind: ViolationKind::IndexGap,
                    description: format!("root commit has idx {}", commit.idx),
                });
            }

            child_idx = Some((commit.sha, commit.idx));
            next = commit.parent;
        }

        Ok(ValidationReport {
            head: head.copied(),
            commit_count,
            shas_valid,
            idx_contiguous,
            parents_present,
            violations,
        })
    }
}
