//! Merkle tree proof implementation
//!
//! This module provides the inclusion proof structure and the verifier. The
//! verifier folds siblings with the same `hash_siblings` rule the builder uses.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use serde::{Serialize, Deserialize};

use crate::config::MerkleConfig;
use crate::crypto::{self, Hash};
use crate::error::{CoreError, Result};
use crate::utils::hex_hash;
use super::{hash_siblings, PairOrdering};

/// Side on which the sibling sits relative to the node being proven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofDirection {
    /// Sibling is the left child
    Left,

    /// Sibling is the right child
    Right,
}

/// Item in a Merkle proof
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofItem {
    /// Hash of the sibling node
    #[serde(with = "hex_hash")]
    pub hash: Hash,

    /// Side of the sibling
    pub direction: ProofDirection,
}

impl Debug for ProofItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "ProofItem {{ hash: {}, direction: {:?} }}",
            hex::encode(&self.hash[0..4]), // Show first 4 bytes of hash
            self.direction
        )
    }
}

/// A proof of inclusion in a Merkle tree
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven
    #[serde(with = "hex_hash")]
    pub leaf: Hash,

    /// Position of the leaf in layer 0
    pub position: usize,

    /// Siblings from the leaf layer up to the root
    pub items: Vec<ProofItem>,
}

impl Debug for MerkleProof {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "MerkleProof {{ leaf: {}, position: {}, items: {:?} }}",
            hex::encode(&self.leaf[0..4]),
            self.position,
            self.items
        )
    }
}

impl MerkleProof {
    /// Create a new proof
    pub fn new(leaf: Hash, position: usize, items: Vec<ProofItem>) -> Self {
        MerkleProof { leaf, position, items }
    }

    /// Sibling hashes as `0x`-prefixed hex, the form handed to external verifiers
    pub fn to_hex(&self) -> Vec<String> {
        self.items.iter().map(|item| crypto::to_hex_prefixed(&item.hash)).collect()
    }

    /// Calculate the root hash from the proof
    pub fn calculate_root(&self, config: &MerkleConfig) -> Hash {
        calculate_root(&self.leaf, &self.items, config)
    }

    /// Verify the proof against a given root hash
    pub fn verify(&self, root: &Hash, config: &MerkleConfig) -> bool {
        verify(&self.leaf, &self.items, root, config)
    }

    /// Get the number of proof items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the proof is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fold a leaf with its proof items into a candidate root
pub fn calculate_root(leaf: &Hash, items: &[ProofItem], config: &MerkleConfig) -> Hash {
    items.iter().fold(*leaf, |current, item| match item.direction {
        ProofDirection::Left => hash_siblings(config, &item.hash, &current),
        ProofDirection::Right => hash_siblings(config, &current, &item.hash),
    })
}

/// Check that `leaf` and `items` reproduce `root`
///
/// A mismatch is a normal `false`, not an error.
pub fn verify(leaf: &Hash, items: &[ProofItem], root: &Hash, config: &MerkleConfig) -> bool {
    crypto::verify_hash(root, &calculate_root(leaf, items, config))
}

/// Verify a plain hex sibling list, as published alongside a record
///
/// Fails with `MalformedProof` when the leaf, the root or any entry is not a
/// 32-byte hex hash. A plain list carries no sides, so only sorted-pair trees
/// can be checked this way.
pub fn verify_hex<S: AsRef<str>>(
    leaf_hex: &str,
    proof_hex: &[S],
    root_hex: &str,
    config: &MerkleConfig,
) -> Result<bool> {
    if config.pair_ordering != PairOrdering::Sorted {
        return Err(CoreError::Config(
            "hex proofs carry no sides; positional trees need full proof items".to_string(),
        ));
    }

    let leaf = crypto::parse_hash(leaf_hex, "leaf")?;
    let root = crypto::parse_hash(root_hex, "root")?;
    let items = proof_hex
        .iter()
        .enumerate()
        .map(|(i, entry)| -> Result<ProofItem> {
            let hash = crypto::parse_hash(entry.as_ref(), &format!("proof entry {}", i))?;
            // Under sorted ordering the side does not affect the parent
            Ok(ProofItem { hash, direction: ProofDirection::Right })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(verify(&leaf, &items, &root, config))
}
