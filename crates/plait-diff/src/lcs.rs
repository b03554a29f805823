//! Longest common subsequence over token sequences.
//!
//! The dynamic-programming table holds prefix lengths, and the subsequence is
//! read back from the bottom-right corner, taking a match whenever the two
//! current entries agree. Ties between skipping in `a` and skipping in `b`
//! skip in `a`, which binds every match to its rightmost possible position
//! in `b`. The result is a pure function of the inputs, which is what makes
//! it safe to memoize.

use std::time::Duration;

use tracing::trace;

use crate::cache::{sequence_key, CacheStats, MemoCache, DEFAULT_TTL};
use crate::token::Token;

/// Compute the longest common subsequence of `a` and `b`.
///
/// A shared prefix and suffix are matched directly; only the differing middle
/// goes through the O(|a|·|b|) table.
pub fn longest_common_subsequence<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let mut result = Vec::with_capacity(prefix + suffix + a_mid.len().min(b_mid.len()));
    result.extend_from_slice(&a[..prefix]);
    result.extend(table_lcs(a_mid, b_mid));
    result.extend_from_slice(&a[a.len() - suffix..]);
    result
}

fn table_lcs<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let width = b.len() + 1;
    let mut table = vec![0u32; (a.len() + 1) * width];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            table[i * width + j] = if a[i - 1] == b[j - 1] {
                table[(i - 1) * width + j - 1] + 1
            } else {
                table[(i - 1) * width + j].max(table[i * width + j - 1])
            };
        }
    }

    let mut result = Vec::with_capacity(table[a.len() * width + b.len()] as usize);
    let (mut i, mut j) = (a.len(), b.len());
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            result.push(a[i - 1].clone());
            i -= 1;
            j -= 1;
        } else if table[(i - 1) * width + j] >= table[i * width + j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    result.reverse();
    result
}

/// Memoizing front end to [`longest_common_subsequence`].
///
/// One instance is meant to be constructed per process and passed by
/// reference into every diff and merge call. Results are keyed by a digest of
/// the exact argument tokens, so eviction never changes an answer.
#[derive(Debug)]
pub struct LcsCache {
    memo: MemoCache<Vec<Token>>,
}

impl LcsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            memo: MemoCache::new(ttl),
        }
    }

    /// The longest common subsequence of two token sequences.
    pub fn lcs(&self, a: &[Token], b: &[Token]) -> Vec<Token> {
        if a.is_empty() || b.is_empty() {
            return Vec::new();
        }
        if a == b {
            return a.to_vec();
        }
        let key = sequence_key("lcs", &[a, b]);
        self.memo.get_or_insert_with(key, || {
            trace!(left = a.len(), right = b.len(), "computing lcs");
            longest_common_subsequence(a, b)
        })
    }

    /// Evict expired entries.
    pub fn sweep(&self) -> usize {
        self.memo.sweep()
    }

    pub fn clear(&self) {
        self.memo.clear()
    }

    pub fn stats(&self) -> CacheStats {
        self.memo.stats()
    }
}

impl Default for LcsCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn lcs_str(a: &str, b: &str) -> String {
        longest_common_subsequence(&chars(a), &chars(b))
            .into_iter()
            .collect()
    }

    fn tokens(s: &str) -> Vec<Token> {
        s.bytes().map(|b| Token::from_digest([b; 32])).collect()
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(lcs_str("", "ABC"), "");
        assert_eq!(lcs_str("ABC", ""), "");
        assert_eq!(lcs_str("", ""), "");
    }

    #[test]
    fn classic_example() {
        assert_eq!(lcs_str("ABCBDAB", "BDCABA").len(), 4);
        assert_eq!(lcs_str("DENF", "DTENPF"), "DENF");
        assert_eq!(lcs_str("DA", "ABC"), "A");
        assert_eq!(lcs_str("DA", "BC"), "");
    }

    #[test]
    fn identical_sequences() {
        assert_eq!(lcs_str("HELLO", "HELLO"), "HELLO");
    }

    #[test]
    fn ties_are_resolved_deterministically() {
        // "AB" and "BA" share either "A" or "B"; skipping in `a` first binds
        // the match to the last entry of `b`.
        assert_eq!(lcs_str("AB", "BA"), "A");
        assert_eq!(lcs_str("AB", "BA"), lcs_str("AB", "BA"));
    }

    #[test]
    fn result_is_a_subsequence_of_both() {
        let a = chars("XMJYAUZ");
        let b = chars("MZJAWXU");
        let lcs = longest_common_subsequence(&a, &b);
        assert_eq!(lcs.iter().collect::<String>(), "MJAU");
        for seq in [&a, &b] {
            let mut it = seq.iter();
            assert!(lcs.iter().all(|c| it.any(|x| x == c)));
        }
    }

    #[test]
    fn cache_returns_same_answer() {
        let cache = LcsCache::default();
        let a = tokens("DTENPF");
        let b = tokens("DENF");
        let first = cache.lcs(&a, &b);
        let second = cache.lcs(&a, &b);
        assert_eq!(first, second);
        assert_eq!(first, tokens("DENF"));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn expired_cache_still_answers() {
        let cache = LcsCache::new(Duration::ZERO);
        let a = tokens("ABCBDAB");
        let b = tokens("BDCABA");
        let first = cache.lcs(&a, &b);
        cache.sweep();
        assert_eq!(cache.lcs(&a, &b), first);
    }
}
