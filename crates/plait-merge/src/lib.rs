//! Merge engine for Plait.
//!
//! Implements a deterministic three-way merge over ordered record sequences.
//! The common backbone of origin, source and target stays in place; the gaps
//! between backbone entries are reconciled against the origin and combined,
//! with a [`MergeDirection`](plait_types::MergeDirection) deciding the order
//! only where the two sides made incompatible changes.
//!
//! # Key Types
//!
//! - [`merge_sequence`] / [`can_auto_merge`] -- Sequence merge and its conflict predicate
//! - [`merge_tokens`] / [`TokenMerge`] -- The same over raw tokens, one pass for both answers
//! - [`merge_states`] / [`StateMerge`] -- Merge of whole repository states

pub mod segment;
pub mod sequence;
pub mod state;

pub use segment::{boundary_offsets, reconcile_segment, segments_around, split_segments};
pub use sequence::{
    can_auto_merge, merge_sequence, merge_sequence_with_outcome, merge_tokens, SequenceMerge,
    TokenMerge,
};
pub use state::{can_auto_merge_states, merge_states, StateMerge};
