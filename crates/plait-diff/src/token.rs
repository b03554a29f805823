//! Stable comparison tokens for sequence entries.

use std::fmt;

use plait_crypto::{ContentHasher, Digest};
use plait_types::DiffElement;

/// The hash of one sequence entry. Two entries compare equal exactly when
/// their tokens do.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(Digest);

impl Token {
    pub const fn from_digest(digest: Digest) -> Self {
        Self(digest)
    }

    pub fn as_bytes(&self) -> &Digest {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:02x}{:02x}{:02x}{:02x})", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Something that can appear in a diffed sequence.
pub trait Tokenize {
    fn token(&self) -> Token;
}

impl Tokenize for DiffElement {
    /// Hash of key and canonical JSON value. Object keys serialize sorted, so
    /// the token does not depend on insertion order.
    fn token(&self) -> Token {
        let value = self.value.to_string();
        Token(
            ContentHasher::ELEMENT.hash_parts([self.key.as_bytes(), value.as_bytes()]),
        )
    }
}

impl Tokenize for String {
    fn token(&self) -> Token {
        Token(ContentHasher::TEXT.hash(self.as_bytes()))
    }
}

impl Tokenize for Token {
    fn token(&self) -> Token {
        *self
    }
}

/// Tokenize every entry of a sequence, preserving order.
pub fn tokenize<T: Tokenize>(sequence: &[T]) -> Vec<Token> {
    sequence.iter().map(Tokenize::token).collect()
}
