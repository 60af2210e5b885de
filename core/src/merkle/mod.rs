//! Merkle tree over drug-record leaves
//!
//! Construction rules, shared bit-for-bit by the builder and the verifier:
//!
//! - Layer 0 is the leaf sequence in input order. Leaves are not deduplicated.
//! - Nodes are paired `(0,1)`, `(2,3)`, ... and the parent is
//!   `H(first || second)` with the same hash function used for leaves.
//! - With [`PairOrdering::Sorted`] the two hashes are ordered ascending by
//!   byte value before concatenation, so proofs need no side information.
//! - An unpaired last node is promoted to the next layer unchanged. It is
//!   never hashed with itself.
//! - A single leaf is its own root.

mod tree;
mod proof;

use serde::{Serialize, Deserialize};

use crate::config::MerkleConfig;
use crate::crypto::Hash;

pub use tree::MerkleTree;
pub use proof::{calculate_root, verify, verify_hex, MerkleProof, ProofDirection, ProofItem};

/// How two siblings are ordered inside the parent's preimage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PairOrdering {
    /// Lower hash first; proofs are plain sibling lists
    #[default]
    Sorted,

    /// Left child first; proofs carry the sibling's side
    Positional,
}

/// Hash two siblings into their parent, `left` being the lower position
pub(crate) fn hash_siblings(config: &MerkleConfig, left: &Hash, right: &Hash) -> Hash {
    let hasher = config.hash_algorithm.hasher();
    match config.pair_ordering {
        PairOrdering::Sorted if right < left => hasher.hash_concat(right, left),
        _ => hasher.hash_concat(left, right),
    }
}
