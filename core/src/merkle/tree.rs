//! Merkle tree construction and proof generation
//!
//! The tree keeps every layer in memory so proofs can be answered without
//! rehashing. It is immutable: changing a batch means building a new tree.

use std::collections::HashSet;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use log::{debug, trace, warn};
use serde::{Serialize, Deserialize};

use crate::config::MerkleConfig;
use crate::crypto::{self, Hash};
use crate::error::{CoreError, Result};
use crate::utils::measure_time;
use super::hash_siblings;
use super::proof::{MerkleProof, ProofDirection, ProofItem};

/// A binary Merkle tree with promoted odd nodes
#[derive(Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// Layer 0 holds the leaves, the last layer holds only the root
    layers: Vec<Vec<Hash>>,

    /// Rules the tree was built with
    config: MerkleConfig,
}

/// On-disk form of a tree, validated when loaded
#[derive(Serialize, Deserialize)]
struct TreeSnapshot {
    config: MerkleConfig,
    layers: Vec<Vec<Hash>>,
}

impl Debug for MerkleTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "MerkleTree {{ root: {}, leaves: {}, depth: {} }}",
            hex::encode(&self.root()[0..4]), // Show first 4 bytes of hash
            self.num_leaves(),
            self.depth()
        )
    }
}

impl MerkleTree {
    /// Build a tree from leaves in the given order
    pub fn from_leaves(leaves: Vec<Hash>, config: MerkleConfig) -> Result<Self> {
        if leaves.is_empty() {
            return Err(CoreError::EmptyTree);
        }

        let distinct: HashSet<&Hash> = leaves.iter().collect();
        if distinct.len() != leaves.len() {
            warn!(
                "building tree with {} duplicate leaves; proofs resolve to the first occurrence",
                leaves.len() - distinct.len()
            );
        }

        let layers = measure_time("merkle tree build", || Self::build_layers(leaves, &config));
        let tree = MerkleTree { layers, config };

        debug!(
            "built Merkle tree: {} leaves, depth {}, root {}",
            tree.num_leaves(),
            tree.depth(),
            tree.root_hex()
        );

        Ok(tree)
    }

    fn build_layers(leaves: Vec<Hash>, config: &MerkleConfig) -> Vec<Vec<Hash>> {
        let mut layers = vec![leaves];

        while layers[layers.len() - 1].len() > 1 {
            let current = &layers[layers.len() - 1];
            let next: Vec<Hash> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_siblings(config, left, right),
                    // Odd number of nodes, promote the last one
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();

            trace!("layer {}: {} -> {} nodes", layers.len() - 1, current.len(), next.len());
            layers.push(next);
        }

        layers
    }

    /// Get the root hash of the tree
    pub fn root(&self) -> Hash {
        self.layers[self.layers.len() - 1][0]
    }

    /// Get the root as a `0x`-prefixed hex string
    pub fn root_hex(&self) -> String {
        crypto::to_hex_prefixed(&self.root())
    }

    /// Leaves in insertion order
    pub fn leaves(&self) -> &[Hash] {
        &self.layers[0]
    }

    /// Leaves as unprefixed hex strings
    pub fn leaves_hex(&self) -> Vec<String> {
        self.leaves().iter().map(hex::encode).collect()
    }

    /// All layers, leaves first
    pub fn layers(&self) -> &[Vec<Hash>] {
        &self.layers
    }

    /// Get the number of leaves in the tree
    pub fn num_leaves(&self) -> usize {
        self.layers[0].len()
    }

    /// Number of hashing layers above the leaves
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    /// Rules the tree was built with
    pub fn config(&self) -> &MerkleConfig {
        &self.config
    }

    /// Position of the first leaf equal to `leaf`
    pub fn position_of(&self, leaf: &Hash) -> Option<usize> {
        self.leaves().iter().position(|l| l == leaf)
    }

    /// Generate a proof for the first occurrence of `leaf`
    pub fn proof(&self, leaf: &Hash) -> Result<MerkleProof> {
        let position = self
            .position_of(leaf)
            .ok_or_else(|| CoreError::LeafNotFound(crypto::to_hex_prefixed(leaf)))?;
        self.proof_at(position)
    }

    /// Generate a proof for the leaf at `position`
    pub fn proof_at(&self, position: usize) -> Result<MerkleProof> {
        if position >= self.num_leaves() {
            return Err(CoreError::LeafNotFound(format!(
                "position {} (tree has {} leaves)",
                position,
                self.num_leaves()
            )));
        }

        let mut items = Vec::with_capacity(self.depth());
        let mut index = position;

        for layer in &self.layers[..self.depth()] {
            let is_right = index % 2 == 1;
            let sibling_index = if is_right { index - 1 } else { index + 1 };

            // A promoted node has no sibling on this layer
            if sibling_index < layer.len() {
                items.push(ProofItem {
                    hash: layer[sibling_index],
                    direction: if is_right { ProofDirection::Left } else { ProofDirection::Right },
                });
            }

            index /= 2;
        }

        trace!("proof for position {}: {} items", position, items.len());

        Ok(MerkleProof::new(self.layers[0][position], position, items))
    }

    /// Verify a proof against this tree's root
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        proof.verify(&self.root(), &self.config)
    }

    /// Snapshot the tree for caching
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = TreeSnapshot {
            config: self.config,
            layers: self.layers.clone(),
        };
        Ok(bincode::serialize(&snapshot)?)
    }

    /// Load a cached snapshot, rebuilding from its leaves to check consistency
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: TreeSnapshot = bincode::deserialize(bytes)?;
        let leaves = snapshot
            .layers
            .first()
            .cloned()
            .ok_or_else(|| CoreError::Serialization("snapshot has no layers".to_string()))?;

        let rebuilt = Self::from_leaves(leaves, snapshot.config)?;
        if rebuilt.layers != snapshot.layers {
            return Err(CoreError::Serialization(
                "cached layers do not match their leaves".to_string(),
            ));
        }

        Ok(rebuilt)
    }
}
