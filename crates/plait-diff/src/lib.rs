//! Diff engine for Plait.
//!
//! Computes positional edit scripts between ordered sequences of hashed
//! records and applies them back. Every entry is reduced to a content
//! [`Token`]; the longest common subsequence of two token sequences is what
//! stays in place, everything else is removed or added.
//!
//! # Key Types
//!
//! - [`Token`] / [`Tokenize`] -- Stable per-entry comparison hash
//! - [`LcsCache`] -- Memoized longest-common-subsequence engine, shared by reference
//! - [`MemoCache`] -- TTL-bounded memo table backing the LCS cache
//! - [`get_diff`] / [`apply_diff`] -- Sequence diff and its apply operator
//! - [`diff_states`] / [`apply_state_diff`] -- The same, per namespace of a repository state

pub mod cache;
pub mod error;
pub mod lcs;
pub mod sequence;
pub mod state_diff;
pub mod token;

pub use cache::{sequence_key, CacheStats, MemoCache, DEFAULT_TTL};
pub use error::{DiffError, DiffResult};
pub use lcs::{longest_common_subsequence, LcsCache};
pub use sequence::{apply_diff, get_diff};
pub use state_diff::{apply_state_diff, diff_states};
pub use token::{tokenize, Token, Tokenize};
