//! Two-way diff of ordered sequences.
//!
//! Entries are compared by [`Token`](crate::token::Token). The edit script
//! removes every `before` entry that is not part of the longest common
//! subsequence and adds every `after` entry that is not, so applying it
//! leaves exactly the common subsequence in place and fills in the rest.

use plait_types::Diff;

use crate::error::{DiffError, DiffResult};
use crate::lcs::LcsCache;
use crate::token::{tokenize, Token, Tokenize};

/// Compute the positional edit script turning `before` into `after`.
pub fn get_diff<T: Tokenize + Clone>(cache: &LcsCache, before: &[T], after: &[T]) -> Diff<T> {
    let before_tokens = tokenize(before);
    let after_tokens = tokenize(after);
    let lcs = cache.lcs(&before_tokens, &after_tokens);

    Diff {
        remove: unmatched(before, &before_tokens, &lcs),
        add: unmatched(after, &after_tokens, &lcs),
    }
}

/// Entries of `sequence` not consumed by an in-order walk over `lcs`.
fn unmatched<T: Clone>(
    sequence: &[T],
    tokens: &[Token],
    lcs: &[Token],
) -> std::collections::BTreeMap<usize, T> {
    let mut next = 0;
    let mut out = std::collections::BTreeMap::new();
    for (index, (entry, token)) in sequence.iter().zip(tokens).enumerate() {
        if lcs.get(next) == Some(token) {
            next += 1;
        } else {
            out.insert(index, entry.clone());
        }
    }
    out
}

/// Apply an edit script to `state`.
///
/// Removals are applied first in ascending original index, each shifted down
/// by the number of removals already applied; additions are then inserted at
/// their target index in ascending order.
pub fn apply_diff<T: Clone>(diff: &Diff<T>, state: &[T]) -> DiffResult<Vec<T>> {
    let mut out = state.to_vec();

    for (offset, &index) in diff.remove.keys().enumerate() {
        let position = index - offset;
        if position >= out.len() {
            return Err(DiffError::RemoveOutOfRange {
                index,
                len: state.len(),
            });
        }
        out.remove(position);
    }

    for (&index, entry) in &diff.add {
        if index > out.len() {
            return Err(DiffError::AddOutOfRange {
                index,
                len: out.len(),
            });
        }
        out.insert(index, entry.clone());
    }

    Ok(out)
}
