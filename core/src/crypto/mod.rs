//! Cryptographic primitives for MedChain
//!
//! Fixed-width hashing, hex rendering of hashes and constant-time comparison.

mod hasher;

pub use hasher::{Blake2sHasher, HashAlgorithm, KeccakHasher, SecureHasher, Sha256Hasher};

use constant_time_eq::constant_time_eq;

use crate::error::{CoreError, Result};

/// A 32-byte hash value (leaf, internal node or root)
pub type Hash = [u8; 32];

/// Keccak-256 of the given bytes
pub fn keccak256(data: &[u8]) -> Hash {
    KeccakHasher.hash(data)
}

/// Verify a hash in constant time to prevent timing attacks
///
/// # Arguments
///
/// * `expected` - Expected hash value
/// * `actual` - Actual hash value to verify
///
/// # Returns
///
/// True if the hashes match, false otherwise
pub fn verify_hash(expected: &Hash, actual: &Hash) -> bool {
    constant_time_eq(expected, actual)
}

/// Render a hash as a `0x`-prefixed lowercase hex string
pub fn to_hex_prefixed(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Parse a 32-byte hash from hex, with or without a `0x` prefix
///
/// `what` names the value in the error message ("root", "proof entry 2", ...).
pub fn parse_hash(input: &str, what: &str) -> Result<Hash> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 64 {
        return Err(CoreError::MalformedProof(format!(
            "{} must be 64 hex characters, got {}",
            what,
            digits.len()
        )));
    }

    let mut out = [0u8; 32];
    hex::decode_to_slice(digits, &mut out)
        .map_err(|e| CoreError::MalformedProof(format!("{}: {}", what, e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_hash() {
        let hash = keccak256(b"test data");

        assert!(verify_hash(&hash, &hash));

        let different_hash = keccak256(b"different data");
        assert!(!verify_hash(&hash, &different_hash));
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = keccak256(b"paracetamol");
        let rendered = to_hex_prefixed(&hash);

        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 66);
        assert_eq!(parse_hash(&rendered, "root").unwrap(), hash);
        assert_eq!(parse_hash(&rendered[2..], "root").unwrap(), hash);
        assert_eq!(parse_hash(&rendered.to_uppercase().replace("0X", "0x"), "root").unwrap(), hash);
    }

    #[test]
    fn test_parse_hash_rejects_bad_input() {
        let short = "0xabcd";
        match parse_hash(short, "root") {
            Err(CoreError::MalformedProof(msg)) => assert!(msg.contains("root")),
            other => panic!("Expected MalformedProof, got {:?}", other),
        }

        let not_hex = format!("0x{}", "zz".repeat(32));
        assert!(matches!(
            parse_hash(&not_hex, "proof entry 0"),
            Err(CoreError::MalformedProof(_))
        ));
    }
}
