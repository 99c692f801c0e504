//! SHA-256 helpers.
//!
//! Digests handed to users carry a `0x` prefix; digests used internally
//! (fake CIDs, checksum inputs) are bare lowercase hex.

use sha2::{Digest, Sha256};

pub const HEX_PREFIX: &str = "0x";

/// Bare lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// `0x`-prefixed lowercase hex SHA-256 of `data`.
pub fn prefixed_sha256(data: &[u8]) -> String {
    format!("{}{}", HEX_PREFIX, sha256_hex(data))
}

/// Drop a leading `0x` if present.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix(HEX_PREFIX).unwrap_or(s)
}

/// True for `0x` followed by exactly 64 hex digits.
pub fn is_prefixed_digest(s: &str) -> bool {
    match s.strip_prefix(HEX_PREFIX) {
        Some(rest) => rest.len() == 64 && rest.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_prefixed_digest_shape() {
        let d = prefixed_sha256(b"");
        assert!(d.starts_with("0x"));
        assert_eq!(d.len(), 66);
        assert!(is_prefixed_digest(&d));
    }

    #[test]
    fn test_is_prefixed_digest_rejects_bare_and_short() {
        assert!(!is_prefixed_digest(&sha256_hex(b"x")));
        assert!(!is_prefixed_digest("0xabc"));
        assert!(!is_prefixed_digest(&format!("0x{}", "g".repeat(64))));
    }

    #[test]
    fn test_strip_hex_prefix() {
        assert_eq!(strip_hex_prefix("0xdead"), "dead");
        assert_eq!(strip_hex_prefix("beef"), "beef");
    }
}
