//! Time-bounded memoization of sequence computations.
//!
//! A [`MemoCache`] maps a structural key (a digest over the exact call
//! arguments) to a computed value. Entries expire `ttl` after insertion;
//! expiry is checked lazily on access and eagerly by [`MemoCache::sweep`],
//! which also runs on a miss once `ttl` has passed since the last sweep. A
//! `ttl` too large to add to the current instant never expires.
//! A miss only costs a recomputation, so a poisoned lock degrades to
//! "always miss" instead of failing the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use plait_crypto::{ContentHasher, Digest};
use tracing::debug;

use crate::token::Token;

/// Default lifetime of a memoized entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct Entry<V> {
    value: V,
    /// `None` never expires.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// A TTL-bounded, thread-safe memo table.
pub struct MemoCache<V> {
    entries: RwLock<HashMap<Digest, Entry<V>>>,
    ttl: Duration,
    last_sweep: Mutex<Instant>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Hit/miss counters of a [`MemoCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl<V: Clone> MemoCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            last_sweep: Mutex::new(Instant::now()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the live value for `key`, computing and storing it on a miss.
    pub fn get_or_insert_with<F>(&self, key: Digest, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        let now = Instant::now();
        if let Ok(entries) = self.entries.read() {
            if let Some(entry) = entries.get(&key) {
                if entry.is_live(now) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return entry.value.clone();
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        if self.sweep_due(now) {
            self.sweep_at(now);
        }
        let value = compute();
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                Entry {
                    value: value.clone(),
                    expires_at: now.checked_add(self.ttl),
                },
            );
        }
        value
    }

    /// Claim the next sweep if `ttl` has passed since the last one.
    fn sweep_due(&self, now: Instant) -> bool {
        let Ok(mut last) = self.last_sweep.lock() else {
            return false;
        };
        if now.saturating_duration_since(*last) < self.ttl {
            return false;
        }
        *last = now;
        true
    }

    /// Drop every expired entry. Returns how many were evicted.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, remaining = entries.len(), "swept memo cache");
        }
        evicted
    }

    /// Remove every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl<V: Clone> Default for MemoCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V> std::fmt::Debug for MemoCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("MemoCache")
            .field("ttl", &self.ttl)
            .field("entries", &entries)
            .finish()
    }
}

/// Structural key over an operation tag and the token sequences it reads.
///
/// Each sequence is framed by its length so `([a], [b, c])` and
/// `([a, b], [c])` key differently.
pub fn sequence_key(op: &str, sequences: &[&[Token]]) -> Digest {
    let lengths: Vec<[u8; 8]> = sequences
        .iter()
        .map(|s| (s.len() as u64).to_le_bytes())
        .collect();
    let mut parts: Vec<&[u8]> = vec![op.as_bytes()];
    for (sequence, len) in sequences.iter().zip(&lengths) {
        parts.push(len.as_slice());
        parts.extend(sequence.iter().map(|t| t.as_bytes().as_slice()));
    }
    ContentHasher::CACHE_KEY.hash_parts(parts)
}
