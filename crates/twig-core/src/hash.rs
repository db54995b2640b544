//! Content hashing using SHA-256.
//!
//! Every digest in twig (blob or commit) is the lowercase hex SHA-256 of
//! the object's canonical bytes.

use sha2::{Digest, Sha256};

/// Length of a full hex digest.
pub const DIGEST_LEN: usize = 64;

/// Compute the SHA-256 hash of arbitrary bytes, returned as a hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// True if `s` has the shape of a full digest.
pub fn is_full_digest(s: &str) -> bool {
    s.len() == DIGEST_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// First `n` characters of a digest, for compact display.
pub fn short(digest: &str, n: usize) -> &str {
    &digest[..n.min(digest.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let h1 = hash_bytes(b"hello world");
        let h2 = hash_bytes(b"hello world");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_different_inputs() {
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn test_hash_length() {
        let h = hash_bytes(b"test");
        assert_eq!(h.len(), DIGEST_LEN);
        assert!(is_full_digest(&h));
    }

    #[test]
    fn test_is_full_digest_rejects_prefixes() {
        let h = hash_bytes(b"test");
        assert!(!is_full_digest(&h[..8]));
        assert!(!is_full_digest(&"z".repeat(DIGEST_LEN)));
    }

    #[test]
    fn test_short_clamps() {
        assert_eq!(short("abcdef", 3), "abc");
        assert_eq!(short("ab", 7), "ab");
    }
}
