//! Storage boundary for Plait.
//!
//! Plait does not own durable storage. This crate defines the
//! [`RepoStore`] trait an embedding application implements, plus an
//! in-memory backend for tests and embedding.
//!
//! # Records
//!
//! - Commits and checkpoints, keyed by repository and [`Sha`](plait_types::Sha)
//! - Branches, keyed by repository and branch id
//! - Repository state, branch bookkeeping, hot checkpoint and working state,
//!   one record each per repository
//!
//! # Storage Backends
//!
//! - [`InMemoryRepoStore`] -- `HashMap`-based store for tests and embedding

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryRepoStore;
pub use traits::RepoStore;
