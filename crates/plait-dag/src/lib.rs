//! Commit graph for Plait.
//!
//! Builds the commit DAG of a repository from its full commit list and
//! annotates every commit with branch lineage, user-branch lineage and
//! current-commit flags for history views.

pub mod dag;
pub mod error;
pub mod node;

pub use dag::SourceGraph;
pub use error::{DagError, DagResult};
pub use node::SourceCommitNode;
