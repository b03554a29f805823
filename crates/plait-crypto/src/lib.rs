//! Content hashing for Plait.
//!
//! Provides domain-separated BLAKE3 hashing. Record tokens, commit shas and
//! memoization keys each hash under their own domain so identical bytes in
//! different roles never collide.
//!
//! All operations wrap `blake3`; there is no custom cryptography.

pub mod hasher;

pub use hasher::{ContentHasher, Digest, HasherError};
