//! Splitting sequences into gap segments around common anchors.
//!
//! Given a sequence and an anchor list that is a subsequence of it, the
//! anchors are bound to positions and the sequence is cut into
//! `anchors.len() + 1` gaps: the entries before the first anchor, between
//! each pair of anchors, and after the last one.

use plait_diff::{LcsCache, Token};

/// Positions of `anchors` inside `sequence`, binding each anchor to the
/// rightmost position that still leaves room for the anchors before it.
///
/// Positions are returned in ascending order. If `anchors` is not a
/// subsequence of `sequence`, only the anchors that could be bound (counting
/// from the end) are returned.
pub fn boundary_offsets(sequence: &[Token], anchors: &[Token]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(anchors.len());
    let mut remaining = anchors.iter().rev().peekable();
    for (index, token) in sequence.iter().enumerate().rev() {
        match remaining.peek() {
            Some(&anchor) if anchor == token => {
                offsets.push(index);
                remaining.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    offsets.reverse();
    offsets
}

/// Cut `sequence` into the gaps around `offsets`.
pub fn split_segments(sequence: &[Token], offsets: &[usize]) -> Vec<Vec<Token>> {
    let mut segments = Vec::with_capacity(offsets.len() + 1);
    let mut start = 0;
    for &offset in offsets {
        segments.push(sequence[start..offset].to_vec());
        start = offset + 1;
    }
    segments.push(sequence[start..].to_vec());
    segments
}

/// Bind `anchors` into `sequence` and return its gap segments.
pub fn segments_around(sequence: &[Token], anchors: &[Token]) -> Vec<Vec<Token>> {
    let offsets = boundary_offsets(sequence, anchors);
    debug_assert_eq!(offsets.len(), anchors.len(), "anchors must be a subsequence");
    split_segments(sequence, &offsets)
}

/// Remove from `segment` the entries it still shares with `origin_segment`.
///
/// What remains is the content this side introduced in the gap. A segment
/// identical to the origin's introduced nothing.
pub fn reconcile_segment(
    cache: &LcsCache,
    origin_segment: &[Token],
    segment: &[Token],
) -> Vec<Token> {
    if segment == origin_segment {
        return Vec::new();
    }
    let shared = cache.lcs(origin_segment, segment);
    if shared.is_empty() {
        return segment.to_vec();
    }
    let offsets = boundary_offsets(segment, &shared);
    let mut keep = offsets.iter().peekable();
    segment
        .iter()
        .enumerate()
        .filter(|(index, _)| {
            if keep.peek() == Some(&index) {
                keep.next();
                false
            } else {
                true
            }
        })
        .map(|(_, token)| *token)
        .collect()
}

/// Reconcile every gap of one side against the matching origin gap.
pub fn reconcile_segments(
    cache: &LcsCache,
    origin_segments: &[Vec<Token>],
    segments: &[Vec<Token>],
) -> Vec<Vec<Token>> {
    origin_segments
        .iter()
        .zip(segments)
        .map(|(origin, segment)| reconcile_segment(cache, origin, segment))
        .collect()
}
