//! Three-way merge of ordered sequences.
//!
//! The merge keeps the backbone that neither side touched (the common
//! subsequence of origin→from and origin→into), cuts all three sequences
//! into gaps around that backbone, strips from each side's gaps what the
//! origin already had, and combines what is left gap by gap.
//!
//! The merged sequence and the conflict flag come out of the same pass, so
//! [`can_auto_merge`] can never disagree with what [`merge_sequence`] does.

use std::collections::HashMap;

use plait_diff::{tokenize, LcsCache, Token, Tokenize};
use plait_types::MergeDirection;
use tracing::trace;

use crate::segment::{reconcile_segments, segments_around};

/// Result of merging token sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMerge {
    pub tokens: Vec<Token>,
    /// `true` if some gap needed a direction-dependent concatenation.
    pub conflicted: bool,
}

/// Result of merging element sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceMerge<T> {
    pub merged: Vec<T>,
    pub conflicted: bool,
}

/// Merge two divergent segments that share no anchor with the origin.
///
/// Common content of the two segments is kept once; what lies between it is
/// merged recursively. Two non-empty segments with nothing in common are a
/// hard conflict and are concatenated in direction order: `from` first for
/// [`MergeDirection::Yours`], `into` first for [`MergeDirection::Theirs`].
fn merge_subsequence(
    cache: &LcsCache,
    from: &[Token],
    into: &[Token],
    direction: MergeDirection,
    conflicted: &mut bool,
) -> Vec<Token> {
    if from.is_empty() {
        return into.to_vec();
    }
    if into.is_empty() || from == into {
        return from.to_vec();
    }

    let common = cache.lcs(from, into);
    if common.is_empty() {
        *conflicted = true;
        let (first, second) = match direction {
            MergeDirection::Yours => (from, into),
            MergeDirection::Theirs => (into, from),
        };
        return first.iter().chain(second).copied().collect();
    }

    let from_gaps = segments_around(from, &common);
    let into_gaps = segments_around(into, &common);
    let mut merged = Vec::with_capacity(from.len() + into.len());
    for (index, (from_gap, into_gap)) in from_gaps.iter().zip(&into_gaps).enumerate() {
        merged.extend(merge_subsequence(cache, from_gap, into_gap, direction, conflicted));
        if let Some(anchor) = common.get(index) {
            merged.push(*anchor);
        }
    }
    merged
}

/// Three-way merge over token sequences.
pub fn merge_tokens(
    cache: &LcsCache,
    origin: &[Token],
    from: &[Token],
    into: &[Token],
    direction: MergeDirection,
) -> TokenMerge {
    let clean = |tokens: &[Token]| TokenMerge {
        tokens: tokens.to_vec(),
        conflicted: false,
    };
    if from == into || into == origin {
        return clean(from);
    }
    if from == origin {
        return clean(into);
    }

    let mut conflicted = false;
    let anchor = cache.lcs(&cache.lcs(origin, from), &cache.lcs(origin, into));
    if anchor.is_empty() {
        let tokens = merge_subsequence(cache, from, into, direction, &mut conflicted);
        return TokenMerge { tokens, conflicted };
    }

    let origin_gaps = segments_around(origin, &anchor);
    let from_gaps = segments_around(from, &anchor);
    let into_gaps = segments_around(into, &anchor);
    let from_reconciled = reconcile_segments(cache, &origin_gaps, &from_gaps);
    let into_reconciled = reconcile_segments(cache, &origin_gaps, &into_gaps);
    trace!(anchors = anchor.len(), "merging gap segments");

    let mut tokens = Vec::with_capacity(from.len().max(into.len()));
    for index in 0..origin_gaps.len() {
        let untouched =
            from_gaps[index] == origin_gaps[index] && into_gaps[index] == origin_gaps[index];
        if untouched {
            tokens.extend_from_slice(&origin_gaps[index]);
        } else if from_reconciled[index] == into_reconciled[index] {
            tokens.extend_from_slice(&from_reconciled[index]);
        } else {
            tokens.extend(merge_subsequence(
                cache,
                &from_reconciled[index],
                &into_reconciled[index],
                direction,
                &mut conflicted,
            ));
        }
        if let Some(token) = anchor.get(index) {
            tokens.push(*token);
        }
    }

    TokenMerge { tokens, conflicted }
}

/// Merge `from` into `into` relative to their common `origin`, reporting
/// whether the result depended on `direction`.
pub fn merge_sequence_with_outcome<T: Tokenize + Clone>(
    cache: &LcsCache,
    origin: &[T],
    from: &[T],
    into: &[T],
    direction: MergeDirection,
) -> SequenceMerge<T> {
    let origin_tokens = tokenize(origin);
    let from_tokens = tokenize(from);
    let into_tokens = tokenize(into);
    let outcome = merge_tokens(cache, &origin_tokens, &from_tokens, &into_tokens, direction);

    let mut entries: HashMap<Token, &T> = HashMap::new();
    let sources = [(into, &into_tokens), (from, &from_tokens), (origin, &origin_tokens)];
    for (sequence, tokens) in sources {
        for (entry, token) in sequence.iter().zip(tokens) {
            entries.entry(*token).or_insert(entry);
        }
    }

    let merged = outcome
        .tokens
        .iter()
        .filter_map(|token| entries.get(token).map(|entry| (*entry).clone()))
        .collect();
    SequenceMerge {
        merged,
        conflicted: outcome.conflicted,
    }
}

/// Merge `from` into `into` relative to their common `origin`.
pub fn merge_sequence<T: Tokenize + Clone>(
    cache: &LcsCache,
    origin: &[T],
    from: &[T],
    into: &[T],
    direction: MergeDirection,
) -> Vec<T> {
    merge_sequence_with_outcome(cache, origin, from, into, direction).merged
}

/// Returns `true` if the merge does not depend on direction, i.e. merging
/// "yours" and "theirs" yield the same sequence.
pub fn can_auto_merge<T: Tokenize + Clone>(
    cache: &LcsCache,
    origin: &[T],
    from: &[T],
    into: &[T],
) -> bool {
    !merge_sequence_with_outcome(cache, origin, from, into, MergeDirection::Yours).conflicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seq(s: &str) -> Vec<String> {
        s.chars().map(|c| c.to_string()).collect()
    }

    fn merge(origin: &str, from: &str, into: &str, direction: MergeDirection) -> String {
        let cache = LcsCache::default();
        merge_sequence(&cache, &seq(origin), &seq(from), &seq(into), direction).concat()
    }

    fn auto(origin: &str, from: &str, into: &str) -> bool {
        let cache = LcsCache::default();
        can_auto_merge(&cache, &seq(origin), &seq(from), &seq(into))
    }

    #[test]
    fn no_origin_no_overlap_conflicts() {
        assert_eq!(merge("", "DA", "BC", MergeDirection::Yours), "DABC");
        assert_eq!(merge("", "DA", "BC", MergeDirection::Theirs), "BCDA");
        assert!(!auto("", "DA", "BC"));
    }

    #[test]
    fn no_origin_overlap_merges_cleanly() {
        assert_eq!(merge("", "DA", "ABC", MergeDirection::Yours), "DABC");
        assert_eq!(merge("", "DA", "ABC", MergeDirection::Theirs), "DABC");
        assert!(auto("", "DA", "ABC"));
    }

    #[test]
    fn deletion_reconciles_cleanly() {
        assert_eq!(merge("DENF", "DTENPF", "DF", MergeDirection::Yours), "DTPF");
        assert_eq!(merge("DENF", "DTENPF", "DF", MergeDirection::Theirs), "DTPF");
        assert!(auto("DENF", "DTENPF", "DF"));
    }

    #[test]
    fn deletion_with_replacement_conflicts() {
        assert_eq!(merge("DENF", "DTENPF", "DXF", MergeDirection::Yours), "DTPXF");
        assert_eq!(merge("DENF", "DTENPF", "DXF", MergeDirection::Theirs), "DXTPF");
        assert!(!auto("DENF", "DTENPF", "DXF"));
    }

    #[test]
    fn one_sided_change_wins() {
        assert_eq!(merge("ABC", "ABC", "ABXC", MergeDirection::Yours), "ABXC");
        assert_eq!(merge("ABC", "AC", "ABC", MergeDirection::Theirs), "AC");
        assert!(auto("ABC", "AC", "ABC"));
    }

    #[test]
    fn disjoint_edits_in_different_gaps() {
        assert_eq!(merge("ABCD", "XABCD", "ABCDY", MergeDirection::Yours), "XABCDY");
        assert!(auto("ABCD", "XABCD", "ABCDY"));
    }

    #[test]
    fn identical_edits_are_kept_once() {
        assert_eq!(merge("AB", "AXB", "AXB", MergeDirection::Yours), "AXB");
        assert_eq!(merge("AB", "AXYB", "AXZB", MergeDirection::Yours), "AXYZB");
        assert!(!auto("AB", "AXYB", "AXZB"));
    }

    #[test]
    fn self_merge_is_identity() {
        assert_eq!(merge("ABC", "ABC", "ABC", MergeDirection::Yours), "ABC");
        assert_eq!(merge("", "", "", MergeDirection::Theirs), "");
    }

    #[test]
    fn outcome_reports_conflict() {
        let cache = LcsCache::default();
        let outcome = merge_sequence_with_outcome(
            &cache,
            &seq("DENF"),
            &seq("DTENPF"),
            &seq("DXF"),
            MergeDirection::Yours,
        );
        assert!(outcome.conflicted);
        assert_eq!(outcome.merged.concat(), "DTPXF");
    }

    proptest! {
        #[test]
        fn auto_merge_iff_direction_independent(
            origin in proptest::collection::vec("[a-e]", 0..10),
            from in proptest::collection::vec("[a-e]", 0..10),
            into in proptest::collection::vec("[a-e]", 0..10),
        ) {
            let cache = LcsCache::default();
            let yours = merge_sequence(&cache, &origin, &from, &into, MergeDirection::Yours);
            let theirs = merge_sequence(&cache, &origin, &from, &into, MergeDirection::Theirs);
            prop_assert_eq!(can_auto_merge(&cache, &origin, &from, &into), yours == theirs);
        }

        #[test]
        fn merging_with_itself_is_identity(x in proptest::collection::vec("[a-e]", 0..16)) {
            let cache = LcsCache::default();
            prop_assert_eq!(merge_sequence(&cache, &x, &x, &x, MergeDirection::Yours), x.clone());
            prop_assert!(can_auto_merge(&cache, &x, &x, &x));
        }

        #[test]
        fn merge_is_deterministic(
            origin in proptest::collection::vec("[a-d]", 0..10),
            from in proptest::collection::vec("[a-d]", 0..10),
            into in proptest::collection::vec("[a-d]", 0..10),
        ) {
            let warm = LcsCache::default();
            let first = merge_sequence(&warm, &origin, &from, &into, MergeDirection::Theirs);
            let second = merge_sequence(&warm, &origin, &from, &into, MergeDirection::Theirs);
            let cold = LcsCache::default();
            let cold = merge_sequence(&cold, &origin, &from, &into, MergeDirection::Theirs);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first, cold);
        }
    }
}
