//! Hasher implementations used for leaves and internal nodes
//!
//! A single `SecureHasher` instance is used for every level of a tree, so leaf
//! hashing and node hashing can never drift apart.

use sha2::{Sha256, Digest};
use blake2::Blake2s256;
use sha3::Keccak256;
use std::fmt::Debug;
use serde::{Serialize, Deserialize};

use super::Hash;

/// Hash algorithm to use for leaves and internal nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// Keccak-256 (Ethereum flavour, legacy padding)
    #[default]
    Keccak256,

    /// SHA-256
    Sha256,

    /// Blake2s-256
    Blake2s,
}

impl HashAlgorithm {
    /// Get the hasher for this algorithm
    pub fn hasher(self) -> &'static dyn SecureHasher {
        match self {
            HashAlgorithm::Keccak256 => &KeccakHasher,
            HashAlgorithm::Sha256 => &Sha256Hasher,
            HashAlgorithm::Blake2s => &Blake2sHasher,
        }
    }
}

/// SecureHasher trait for fixed-width hashing
pub trait SecureHasher: Debug + Send + Sync {
    /// The algorithm this hasher implements
    fn algorithm(&self) -> HashAlgorithm;

    /// Hash arbitrary bytes
    fn hash(&self, data: &[u8]) -> Hash;

    /// Hash the 64-byte concatenation `first || second`
    fn hash_concat(&self, first: &Hash, second: &Hash) -> Hash {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(first);
        buf[32..].copy_from_slice(second);
        self.hash(&buf)
    }
}

fn finalize_into<D: Digest>(digest: D) -> Hash {
    let result = digest.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Keccak-256 implementation of SecureHasher
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakHasher;

impl SecureHasher for KeccakHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Keccak256
    }

    fn hash(&self, data: &[u8]) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        finalize_into(hasher)
    }
}

/// SHA-256 implementation of SecureHasher
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl SecureHasher for Sha256Hasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn hash(&self, data: &[u8]) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(data);
        finalize_into(hasher)
    }
}

/// Blake2s implementation of SecureHasher
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake2sHasher;

impl SecureHasher for Blake2sHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Blake2s
    }

    fn hash(&self, data: &[u8]) -> Hash {
        let mut hasher = Blake2s256::new();
        hasher.update(data);
        finalize_into(hasher)
    }
}
