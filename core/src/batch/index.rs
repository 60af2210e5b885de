//! Reverse lookup from leaf hash to record position

use std::collections::HashMap;

use crate::crypto::Hash;

/// Maps each distinct leaf to the position of its first occurrence
#[derive(Debug, Clone, Default)]
pub struct BatchIndex {
    positions: HashMap<Hash, usize>,
}

impl BatchIndex {
    /// Index a leaf sequence
    pub fn new(leaves: &[Hash]) -> Self {
        let mut positions = HashMap::with_capacity(leaves.len());
        for (position, leaf) in leaves.iter().enumerate() {
            positions.entry(*leaf).or_insert(position);
        }
        BatchIndex { positions }
    }

    /// First position of `leaf`, if present
    pub fn position_of(&self, leaf: &Hash) -> Option<usize> {
        self.positions.get(leaf).copied()
    }

    /// Number of distinct leaves
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
