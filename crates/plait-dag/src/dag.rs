//! The commit graph of a repository.
//!
//! [`SourceGraph`] stores every commit in a [`HashMap`] arena keyed by sha,
//! with a forward-edge index (`children`) per node. After construction it
//! annotates each node with branch lineage flags, so a history view can ask
//! "is this commit on a branch?" without walking history per query.
//!
//! # Invariants
//!
//! - Every non-root commit's parent is in the graph.
//! - Shas are unique within the graph.
//! - At most one node is current.

use std::collections::HashMap;

use plait_types::{Branch, BranchesMetaState, CommitData, Sha};
use tracing::debug;

use crate::error::{DagError, DagResult};
use crate::node::SourceCommitNode;

/// Commit DAG with lineage annotations.
#[derive(Clone, Debug, Default)]
pub struct SourceGraph {
    nodes: HashMap<Sha, SourceCommitNode>,
    /// Commits with no parent, oldest first.
    roots: Vec<Sha>,
    current: Option<Sha>,
}

impl SourceGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `commits` into a graph. The commits may arrive in any order.
    pub fn build(mut commits: Vec<CommitData>) -> DagResult<Self> {
        commits.sort_by(|a, b| {
            a.idx
                .cmp(&b.idx)
                .then(a.timestamp.cmp(&b.timestamp))
                .then(a.sha.cmp(&b.sha))
        });

        let mut graph = Self::new();
        let mut order = Vec::with_capacity(commits.len());
        for commit in commits {
            let sha = commit.sha;
            if graph.nodes.contains_key(&sha) {
                return Err(DagError::DuplicateCommit(sha));
            }
            order.push((sha, commit.parent));
            graph.nodes.insert(sha, SourceCommitNode::new(commit));
        }

        for (sha, parent) in order {
            match parent {
                None => graph.roots.push(sha),
                Some(parent) => {
                    let node = graph.nodes.get_mut(&parent).ok_or(DagError::DanglingParent {
                        commit: sha,
                        parent,
                    })?;
                    node.children.push(sha);
                }
            }
        }

        debug!(commits = graph.nodes.len(), roots = graph.roots.len(), "built source graph");
        Ok(graph)
    }

    /// Build the graph and apply every annotation in one step.
    pub fn from_parts(
        commits: Vec<CommitData>,
        branches: &[Branch],
        meta: &BranchesMetaState,
        current: Option<&Sha>,
    ) -> DagResult<Self> {
        let mut graph = Self::build(commits)?;
        graph.annotate_branches(branches, meta)?;
        graph.mark_current(current)?;
        Ok(graph)
    }

    /// Total number of commits in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no commits.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, sha: &Sha) -> Option<&SourceCommitNode> {
        self.nodes.get(sha)
    }

    pub fn contains(&self, sha: &Sha) -> bool {
        self.nodes.contains_key(sha)
    }

    /// All root commits, oldest first.
    pub fn roots(&self) -> Vec<&SourceCommitNode> {
        self.roots.iter().filter_map(|sha| self.nodes.get(sha)).collect()
    }

    /// Direct children of `sha`, oldest first.
    pub fn children(&self, sha: &Sha) -> Vec<&SourceCommitNode> {
        self.nodes
            .get(sha)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The checked-out commit, if it is in the graph.
    pub fn current(&self) -> Option<&SourceCommitNode> {
        self.current.as_ref().and_then(|sha| self.nodes.get(sha))
    }

    // ---------------------------------------------------------------
    // Annotation
    // ---------------------------------------------------------------

    /// Record branch heads and flag every commit reachable from one.
    ///
    /// Commits reachable from a branch listed in `meta.user_branches` are
    /// additionally flagged as user lineage.
    pub fn annotate_branches(
        &mut self,
        branches: &[Branch],
        meta: &BranchesMetaState,
    ) -> DagResult<()> {
        for branch in branches {
            let Some(head) = branch.last_commit else {
                continue;
            };
            let node = self
                .nodes
                .get_mut(&head)
                .ok_or(DagError::CommitNotFound(head))?;
            if !node.branch_ids.contains(&branch.id) {
                node.branch_ids.push(branch.id.clone());
                node.branch_ids.sort();
            }

            self.mark_lineage(&head, |node| &mut node.is_in_branch_lineage);
            if meta.is_user_branch(&branch.id) {
                self.mark_lineage(&head, |node| &mut node.is_in_user_branch_lineage);
            }
        }
        Ok(())
    }

    /// Make `sha` the only current node. `None` clears the flag.
    pub fn mark_current(&mut self, sha: Option<&Sha>) -> DagResult<()> {
        if let Some(sha) = sha {
            if !self.nodes.contains_key(sha) {
                return Err(DagError::CommitNotFound(*sha));
            }
        }
        if let Some(previous) = self.current.take() {
            if let Some(node) = self.nodes.get_mut(&previous) {
                node.is_current = false;
            }
        }
        if let Some(sha) = sha {
            if let Some(node) = self.nodes.get_mut(sha) {
                node.is_current = true;
            }
            self.current = Some(*sha);
        }
        Ok(())
    }

    /// Set a flag on `head` and every ancestor. A walk stops at the first
    /// node already flagged, since its ancestors are flagged too.
    fn mark_lineage(&mut self, head: &Sha, flag: fn(&mut SourceCommitNode) -> &mut bool) {
        let mut next = Some(*head);
        while let Some(sha) = next {
            let Some(node) = self.nodes.get_mut(&sha) else {
                break;
            };
            let marked = flag(node);
            if *marked {
                break;
            }
            *marked = true;
            next = node.commit.parent;
        }
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// All commits with parents before children: by idx, then timestamp,
    /// then sha.
    pub fn topological_order(&self) -> Vec<&SourceCommitNode> {
        let mut nodes: Vec<&SourceCommitNode> = self.nodes.values().collect();
        nodes.sort_by(|a, b| {
            a.commit
                .idx
                .cmp(&b.commit.idx)
                .then(a.commit.timestamp.cmp(&b.commit.timestamp))
                .then(a.sha().cmp(&b.sha()))
        });
        nodes
    }

    /// Commits not reachable from any branch head.
    pub fn detached(&self) -> Vec<&SourceCommitNode> {
        self.topological_order()
            .into_iter()
            .filter(|node| !node.is_in_branch_lineage)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use plait_types::StateDiff;

    fn sha(n: u16) -> Sha {
        let mut bytes = [0u8; 32];
        bytes[..2].copy_from_slice(&n.to_be_bytes());
        Sha::from_hash(bytes)
    }

    fn commit(n: u16, parent: Option<&CommitData>) -> CommitData {
        CommitData {
            sha: sha(n),
            parent: parent.map(|p| p.sha),
            historical_parent: parent.map(|p| p.sha),
            idx: parent.map_or(0, |p| p.idx + 1),
            diff: StateDiff::new(),
            user_id: "ada".into(),
            message: format!("commit {n}"),
            timestamp: Utc.timestamp_opt(1_700_000_000 + i64::from(n), 0).unwrap(),
            merge_base: None,
        }
    }

    fn branch(name: &str, head: &CommitData) -> Branch {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Branch::new(name, Some(head.sha), None, "ada", at).unwrap()
    }

    /// 1 - 2 - 3 (main)
    ///      \
    ///       4 - 5 (feature)
    ///
    /// 6 is a dangling tip off 3 that no branch points at.
    fn forked() -> (Vec<CommitData>, Vec<Branch>) {
        let c1 = commit(1, None);
        let c2 = commit(2, Some(&c1));
        let c3 = commit(3, Some(&c2));
        let c4 = commit(4, Some(&c2));
        let c5 = commit(5, Some(&c4));
        let c6 = commit(6, Some(&c3));
        let branches = vec![branch("main", &c3), branch("feature", &c5)];
        (vec![c6, c5, c4, c3, c2, c1], branches)
    }

    fn user_meta(owned: &[&str]) -> BranchesMetaState {
        let mut meta = BranchesMetaState::default();
        for id in ["main", "feature"] {
            meta.record(id, None, owned.contains(&id));
        }
        meta
    }

    #[test]
    fn linear_chain_structure() {
        let c1 = commit(1, None);
        let c2 = commit(2, Some(&c1));
        let c3 = commit(3, Some(&c2));
        let graph = SourceGraph::build(vec![c3, c1, c2]).unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.roots().len(), 1);
        assert_eq!(graph.roots()[0].sha(), sha(1));
        assert_eq!(graph.children(&sha(1))[0].sha(), sha(2));
        assert!(graph.children(&sha(3)).is_empty());
    }

    #[test]
    fn fork_children_are_ordered() {
        let (commits, _) = forked();
        let graph = SourceGraph::build(commits).unwrap();
        let children: Vec<Sha> = graph.children(&sha(2)).iter().map(|n| n.sha()).collect();
        assert_eq!(children, vec![sha(3), sha(4)]);
        assert!(graph.get(&sha(2)).unwrap().is_fork());
    }

    #[test]
    fn branch_lineage_is_marked() {
        let (commits, branches) = forked();
        let graph = SourceGraph::from_parts(commits, &branches, &user_meta(&[]), None).unwrap();

        for n in 1..=5 {
            assert!(graph.get(&sha(n)).unwrap().is_in_branch_lineage, "commit {n}");
        }
        assert!(!graph.get(&sha(6)).unwrap().is_in_branch_lineage);
        assert_eq!(graph.get(&sha(3)).unwrap().branch_ids, vec!["main"]);
        assert_eq!(graph.get(&sha(5)).unwrap().branch_ids, vec!["feature"]);
        let detached: Vec<Sha> = graph.detached().iter().map(|n| n.sha()).collect();
        assert_eq!(detached, vec![sha(6)]);
    }

    #[test]
    fn user_lineage_follows_owned_branches() {
        let (commits, branches) = forked();
        let graph =
            SourceGraph::from_parts(commits, &branches, &user_meta(&["feature"]), None).unwrap();

        for n in [1, 2, 4, 5] {
            assert!(graph.get(&sha(n)).unwrap().is_in_user_branch_lineage, "commit {n}");
        }
        assert!(!graph.get(&sha(3)).unwrap().is_in_user_branch_lineage);
        assert!(graph.get(&sha(3)).unwrap().is_in_branch_lineage);
    }

    #[test]
    fn at_most_one_current() {
        let (commits, branches) = forked();
        let mut graph =
            SourceGraph::from_parts(commits, &branches, &user_meta(&[]), Some(&sha(3))).unwrap();
        assert_eq!(graph.current().unwrap().sha(), sha(3));

        graph.mark_current(Some(&sha(5))).unwrap();
        let current: Vec<Sha> = graph
            .topological_order()
            .iter()
            .filter(|n| n.is_current)
            .map(|n| n.sha())
            .collect();
        assert_eq!(current, vec![sha(5)]);

        graph.mark_current(None).unwrap();
        assert!(graph.current().is_none());
        assert!(matches!(
            graph.mark_current(Some(&sha(99))),
            Err(DagError::CommitNotFound(_))
        ));
    }

    #[test]
    fn dangling_parent_is_rejected() {
        let c1 = commit(1, None);
        let c2 = commit(2, Some(&c1));
        assert_eq!(
            SourceGraph::build(vec![c2]).unwrap_err(),
            DagError::DanglingParent {
                commit: sha(2),
                parent: sha(1),
            }
        );
    }

    #[test]
    fn duplicate_commit_is_rejected() {
        let c1 = commit(1, None);
        assert_eq!(
            SourceGraph::build(vec![c1.clone(), c1]).unwrap_err(),
            DagError::DuplicateCommit(sha(1))
        );
    }

    #[test]
    fn branch_head_outside_graph_is_rejected() {
        let c1 = commit(1, None);
        let ghost = commit(7, None);
        let mut graph = SourceGraph::build(vec![c1]).unwrap();
        let result = graph.annotate_branches(&[branch("main", &ghost)], &user_meta(&[]));
        assert_eq!(result, Err(DagError::CommitNotFound(sha(7))));
    }

    #[test]
    fn topological_order_puts_parents_first() {
        let (commits, _) = forked();
        let graph = SourceGraph::build(commits).unwrap();
        let order = graph.topological_order();
        let position: HashMap<Sha, usize> =
            order.iter().enumerate().map(|(i, n)| (n.sha(), i)).collect();
        for node in &order {
            if let Some(parent) = node.commit.parent {
                assert!(position[&parent] < position[&node.sha()]);
            }
        }
    }

    #[test]
    fn long_lineage_is_marked_without_recursion() {
        let mut commits = vec![commit(0, None)];
        for n in 1..5_000u16 {
            let next = commit(n, commits.last());
            commits.push(next);
        }
        let head = commits[4_999].clone();
        let graph =
            SourceGraph::from_parts(commits, &[branch("main", &head)], &user_meta(&["main"]), None)
                .unwrap();
        assert!(graph.get(&sha(0)).unwrap().is_in_user_branch_lineage);
    }
}
