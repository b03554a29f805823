/// A 32-byte BLAKE3 digest.
pub type Digest = [u8; 32];

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"plait-element-v1"`) that is
/// prepended to every hash computation, so a record token and a commit sha
/// over identical bytes still differ.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for key/value records.
    pub const ELEMENT: Self = Self {
        domain: "plait-element-v1",
    };
    /// Hasher for plain text entries (description lines, binary refs).
    pub const TEXT: Self = Self {
        domain: "plait-text-v1",
    };
    /// Hasher for commit shas.
    pub const COMMIT: Self = Self {
        domain: "plait-commit-v1",
    };
    /// Hasher for memoization keys.
    pub const CACHE_KEY: Self = Self {
        domain: "plait-cache-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = self.start();
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Hash a list of parts. Each part is length-prefixed, so `["ab", "c"]`
    /// and `["a", "bc"]` produce different digests.
    pub fn hash_parts<'a, I>(&self, parts: I) -> Digest
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = self.start();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }

    /// Hash a serializable value as JSON with domain separation.
    ///
    /// `serde_json` orders object keys, so structurally equal values always
    /// hash equal.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<Digest, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::ELEMENT.hash(data), ContentHasher::ELEMENT.hash(data));
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let element = ContentHasher::ELEMENT.hash(data);
        let text = ContentHasher::TEXT.hash(data);
        let commit = ContentHasher::COMMIT.hash(data);
        assert_ne!(element, text);
        assert_ne!(element, commit);
        assert_ne!(text, commit);
    }

    #[test]
    fn parts_are_length_prefixed() {
        let a = ContentHasher::CACHE_KEY.hash_parts([b"ab".as_slice(), b"c".as_slice()]);
        let b = ContentHasher::CACHE_KEY.hash_parts([b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a, b);
    }

    #[test]
    fn verify_detects_tampering() {
        let digest = ContentHasher::TEXT.hash(b"original");
        assert!(ContentHasher::TEXT.verify(b"original", &digest));
        assert!(!ContentHasher::TEXT.verify(b"tampered", &digest));
    }

    #[test]
    fn hash_json_ignores_key_insertion_order() {
        let a: serde_json::Value = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"y": 2, "x": 1}"#).unwrap();
        assert_eq!(
            ContentHasher::ELEMENT.hash_json(&a).unwrap(),
            ContentHasher::ELEMENT.hash_json(&b).unwrap()
        );
    }

    #[test]
    fn custom_domain() {
        let hasher = ContentHasher::new("my-custom-domain-v1");
        assert_ne!(hasher.hash(b"data"), ContentHasher::ELEMENT.hash(b"data"));
        assert_eq!(hasher.domain(), "my-custom-domain-v1");
    }
}
