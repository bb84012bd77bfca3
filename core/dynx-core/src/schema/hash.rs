//! Long-string digests for `hash_` companion columns
//!
//! A unique index key has a fixed maximum width, so unbounded text is indexed
//! through a 32-character digest: the first 16 bytes of SHA-256, hex encoded.
//!
//! Stores whose `hash_` columns were filled with a different 128-bit digest
//! (MurmurHash3 hex, for instance) are not compatible: their rows will not
//! match equality lookups or unique checks made with this digest. Such a
//! store needs its `hash_` columns cleared to NULL and backfilled again.

use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Digest length in characters.
pub const DIGEST_LEN: usize = 32;

/// Computes the companion-column digest of `text`.
pub fn digest(text: &str) -> String {
    let hash = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(DIGEST_LEN);
    for byte in &hash[..DIGEST_LEN / 2] {
        // writing into a String cannot fail
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_fixed_width_hex() {
        let long = "x".repeat(100_000);
        for text in ["", "hello", long.as_str()] {
            let d = digest(text);
            assert_eq!(d.len(), DIGEST_LEN);
            assert!(d.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_digest_known_value() {
        // sha256("hello") = 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
        assert_eq!(digest("hello"), "2cf24dba5fb0a30e26e83b2ac5b9e29e");
    }

    #[test]
    fn test_digest_distinguishes_content() {
        assert_ne!(digest("FOO"), digest("BAR"));
        assert_eq!(digest("FOO"), digest("FOO"));
    }
}
