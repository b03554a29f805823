//! Merging another commit into the checked-out head.
//!
//! A merge walks both histories back to their divergence origin and merges
//! the three materialized states. When the head is still at the origin the
//! branch simply moves forward. Otherwise a base commit carrying the source
//! branch's changes is appended to the origin, every target commit past the
//! origin is replayed on top of it, and a merge commit closes the chain. A
//! merge that depends on direction stops in a conflict state until it is
//! resolved or aborted.

use chrono::Utc;
use plait_diff::{apply_state_diff, diff_states};
use plait_ledger::{
    commits_after, create_merge_base, create_merge_commit, divergence_origin, rebase_commit,
    LedgerError,
};
use plait_merge::{can_auto_merge_states, merge_states};
use plait_store::RepoStore;
use plait_types::{ApplicationKvState, CommitData, MergeDirection, MergeState, RepoState, Sha};
use tracing::{debug, info, warn};

use crate::commit::{MergeReport, MergeStatus};
use crate::error::{SdkError, SdkResult};
use crate::repository::Repository;

/// Everything a merge needs, read before anything is written.
#[derive(Debug)]
pub(crate) struct MergePlan {
    pub from: Sha,
    pub into: Option<Sha>,
    pub origin: Option<Sha>,
    /// Target commits past the origin, oldest first.
    pub trailing: Vec<CommitData>,
    pub origin_state: ApplicationKvState,
    pub from_state: ApplicationKvState,
    pub into_state: ApplicationKvState,
}

impl MergePlan {
    pub fn is_fast_forward(&self) -> bool {
        self.into == self.origin
    }

    pub fn is_up_to_date(&self) -> bool {
        self.into == Some(self.from) || self.origin == Some(self.from)
    }
}

impl<S: RepoStore> Repository<S> {
    pub(crate) fn plan_merge(&self, from: &Sha, into: Option<&Sha>) -> SdkResult<MergePlan> {
        let from_history = self.get_history(Some(from))?;
        let into_history = self.get_history(into)?;
        let origin = divergence_origin(&from_history, &into_history);
        let trailing = commits_after(&into_history, origin.as_ref());

        let states = self.states();
        let plan = MergePlan {
            from: *from,
            into: into.copied(),
            origin,
            trailing,
            origin_state: states.get_commit_state(origin.as_ref())?,
            from_state: states.get_commit_state(Some(from))?,
            into_state: states.get_commit_state(into)?,
        };
        debug!(
            repo_id = %self.repo_id,
            from = %from.short_hex(),
            origin = ?plan.origin.map(|sha| sha.short_hex()),
            trailing = plan.trailing.len(),
            "planned merge"
        );
        Ok(plan)
    }

    /// Merge `from` into the checked-out head.
    ///
    /// `direction` defaults to the configured one. A clean merge is
    /// committed immediately; a conflicted one leaves the repository in a
    /// merge conflict with the direction-rendered result as working state.
    pub fn merge_commit(
        &self,
        from: &Sha,
        direction: Option<MergeDirection>,
    ) -> SdkResult<MergeReport> {
        let direction = direction.unwrap_or(self.config.default_direction);
        let user = self.require_user()?;
        let state = self.repo_state()?;
        if state.is_in_merge_conflict {
            warn!(repo_id = %self.repo_id, "refused merge during merge conflict");
            return Err(SdkError::InvalidOperation(
                "a merge is already in progress".into(),
            ));
        }

        let plan = self.plan_merge(from, state.commit.as_ref())?;
        if plan.is_up_to_date() {
            return Err(SdkError::InvalidOperation("already up to date".into()));
        }
        if plan.is_fast_forward() {
            return self.fast_forward(&state, &plan, direction);
        }
        if self.has_uncommitted_changes()? {
            warn!(repo_id = %self.repo_id, "refused merge with uncommitted changes");
            return Err(SdkError::InvalidOperation(
                "commit or discard uncommitted changes before merging".into(),
            ));
        }

        let merged = merge_states(
            &self.cache,
            &plan.origin_state,
            &plan.from_state,
            &plan.into_state,
            direction,
        );
        if merged.is_conflicted() {
            let head = state.commit;
            let next = RepoState {
                is_in_merge_conflict: true,
                merge: Some(MergeState {
                    from_sha: plan.from,
                    into_sha: plan.into,
                    origin_sha: plan.origin,
                    direction,
                }),
                ..state
            };
            self.store.save_current_state(&self.repo_id, &merged.state)?;
            self.store.save_current_repo_state(&self.repo_id, &next)?;
            info!(
                repo_id = %self.repo_id,
                from = %from.short_hex(),
                conflicts = ?merged.conflicts,
                "merge stopped on conflict"
            );
            return Ok(MergeReport {
                status: MergeStatus::Conflicted,
                head,
                origin: plan.origin,
                merge_base: None,
                rebased: Vec::new(),
                conflicts: merged.conflicts,
            });
        }

        let message = self.merge_message(&state, from);
        self.rebase_and_commit(&state, &plan, direction, &merged.state, user, &message)
    }

    fn fast_forward(
        &self,
        state: &RepoState,
        plan: &MergePlan,
        direction: MergeDirection,
    ) -> SdkResult<MergeReport> {
        let working = self.working_state()?;
        let working = if working == plan.into_state {
            plan.from_state.clone()
        } else {
            let rebased = merge_states(
                &self.cache,
                &plan.into_state,
                &plan.from_state,
                &working,
                direction,
            );
            if rebased.is_conflicted() {
                warn!(
                    repo_id = %self.repo_id,
                    conflicts = ?rebased.conflicts,
                    "uncommitted changes conflict with fast-forward"
                );
                return Err(SdkError::Conflict(format!(
                    "uncommitted changes conflict in {}",
                    rebased.conflicts.join(", ")
                )));
            }
            rebased.state
        };

        self.advance_head(state, plan.from, &[], &plan.from_state, &working)?;
        info!(repo_id = %self.repo_id, head = %plan.from.short_hex(), "fast-forwarded");
        Ok(MergeReport {
            status: MergeStatus::FastForward,
            head: Some(plan.from),
            origin: plan.origin,
            merge_base: None,
            rebased: Vec::new(),
            conflicts: Vec::new(),
        })
    }

    /// Append the merge base, the rebased target commits and the merge
    /// commit whose state is `merged`, then move the head onto it.
    fn rebase_and_commit(
        &self,
        state: &RepoState,
        plan: &MergePlan,
        direction: MergeDirection,
        merged: &ApplicationKvState,
        user: &str,
        message: &str,
    ) -> SdkResult<MergeReport> {
        let origin = match &plan.origin {
            Some(sha) => Some(self.read_commit(sha)?),
            None => None,
        };
        let from = self.read_commit(&plan.from)?;
        let now = Utc::now();

        let base = create_merge_base(
            origin.as_ref(),
            &from,
            diff_states(&self.cache, &plan.origin_state, &plan.from_state),
            user,
            &format!("Merge base for {}", plan.from.short_hex()),
            now,
        )?;

        let mut commits = Vec::with_capacity(plan.trailing.len() + 2);
        commits.push(base.clone());
        let mut rebased = Vec::with_capacity(plan.trailing.len());
        let mut previous_state = plan.from_state.clone();
        let mut target_state = plan.origin_state.clone();
        for commit in &plan.trailing {
            target_state = apply_state_diff(&commit.diff, &target_state).map_err(|source| {
                LedgerError::Replay {
                    sha: commit.sha,
                    source,
                }
            })?;
            let replayed = merge_states(
                &self.cache,
                &plan.origin_state,
                &plan.from_state,
                &target_state,
                direction,
            )
            .state;
            let parent = commits.last().unwrap_or(&base);
            let moved = rebase_commit(
                commit,
                parent,
                diff_states(&self.cache, &previous_state, &replayed),
            )?;
            rebased.push(moved.sha);
            commits.push(moved);
            previous_state = replayed;
        }

        let tip = commits.last().unwrap_or(&base);
        let merge = create_merge_commit(
            tip,
            plan.into.as_ref(),
            &base,
            diff_states(&self.cache, &previous_state, merged),
            user,
            message,
            now,
        )?;
        let head = merge.sha;
        commits.push(merge);

        self.advance_head(state, head, &commits, merged, merged)?;
        info!(
            repo_id = %self.repo_id,
            head = %head.short_hex(),
            base = %base.sha.short_hex(),
            rebased = rebased.len(),
            "merged"
        );
        Ok(MergeReport {
            status: MergeStatus::Merged,
            head: Some(head),
            origin: plan.origin,
            merge_base: Some(base.sha),
            rebased,
            conflicts: Vec::new(),
        })
    }

    fn merge_message(&self, state: &RepoState, from: &Sha) -> String {
        match &state.branch {
            Some(branch) => format!("Merge {} into {}", from.short_hex(), branch),
            None => format!("Merge {}", from.short_hex()),
        }
    }

    fn in_progress_merge(&self) -> SdkResult<(RepoState, MergeState)> {
        let state = self.repo_state()?;
        let merge = state
            .merge
            .clone()
            .filter(|_| state.is_in_merge_conflict)
            .ok_or_else(|| SdkError::InvalidOperation("no merge in progress".into()))?;
        Ok((state, merge))
    }

    /// Re-render a conflicted merge with the other side first.
    ///
    /// Hand edits to the working state are replaced.
    pub fn update_merge_direction(&self, direction: MergeDirection) -> SdkResult<Vec<String>> {
        let (state, merge) = self.in_progress_merge()?;
        let plan = self.plan_merge(&merge.from_sha, merge.into_sha.as_ref())?;
        let merged = merge_states(
            &self.cache,
            &plan.origin_state,
            &plan.from_state,
            &plan.into_state,
            direction,
        );

        let next = RepoState {
            merge: Some(MergeState { direction, ..merge }),
            ..state
        };
        self.store.save_current_state(&self.repo_id, &merged.state)?;
        self.store.save_current_repo_state(&self.repo_id, &next)?;
        debug!(repo_id = %self.repo_id, ?direction, "updated merge direction");
        Ok(merged.conflicts)
    }

    /// Commit the working state as the result of the conflicted merge.
    pub fn resolve_merge(&self) -> SdkResult<MergeReport> {
        let user = self.require_user()?;
        let (state, merge) = self.in_progress_merge()?;
        let plan = self.plan_merge(&merge.from_sha, merge.into_sha.as_ref())?;
        let resolved = self.working_state()?;
        let message = self.merge_message(&state, &merge.from_sha);
        self.rebase_and_commit(&state, &plan, merge.direction, &resolved, user, &message)
    }

    /// Leave the conflict state and restore the target head.
    pub fn abort_merge(&self) -> SdkResult<RepoState> {
        let (state, _) = self.in_progress_merge()?;
        let committed = self.states().get_unstaged_commit_state(state.commit.as_ref())?;
        let next = RepoState {
            is_in_merge_conflict: false,
            merge: None,
            ..state
        };
        self.store.save_current_repo_state(&self.repo_id, &next)?;
        self.store.save_current_state(&self.repo_id, &committed)?;
        info!(repo_id = %self.repo_id, "aborted merge");
        Ok(next)
    }

    /// Whether merging `from` into `into` is independent of direction.
    pub fn can_auto_merge_commit_states(&self, from: &Sha, into: Option<&Sha>) -> SdkResult<bool> {
        let plan = self.plan_merge(from, into)?;
        Ok(can_auto_merge_states(
            &self.cache,
            &plan.origin_state,
            &plan.from_state,
            &plan.into_state,
        ))
    }
}
