//! Self-contained proof artifact for one drug record
//!
//! A bundle travels with the physical unit (for example inside a scannable
//! code). The root it carries is informational; verifiers should check against
//! the root published on the ledger with [`ProofBundle::verify_against`].

use log::debug;
use serde::{Serialize, Deserialize};

use crate::config::MerkleConfig;
use crate::crypto::{self, Hash};
use crate::encoding::leaf_hash;
use crate::error::{to_malformed_proof_error, Result};
use crate::merkle::{self, ProofItem};
use crate::models::DrugRecord;
use crate::utils::hex_hash;

/// Record, leaf, root and sibling path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBundle {
    /// The record being proven
    pub record: DrugRecord,

    /// Leaf hash of the record when the bundle was issued
    #[serde(with = "hex_hash")]
    pub leaf: Hash,

    /// Batch root when the bundle was issued
    #[serde(with = "hex_hash")]
    pub root: Hash,

    /// Siblings from the leaf to the root
    pub proof: Vec<ProofItem>,
}

impl ProofBundle {
    /// Parse a bundle; any structural problem is a malformed proof
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(to_malformed_proof_error)
    }

    /// Render as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Root as `0x` hex
    pub fn root_hex(&self) -> String {
        crypto::to_hex_prefixed(&self.root)
    }

    /// Verify against the root embedded in the bundle
    pub fn verify(&self, config: &MerkleConfig) -> Result<bool> {
        self.verify_against(&self.root, config)
    }

    /// Verify against an externally published root
    ///
    /// The leaf is recomputed from the record; a stale or forged `leaf` field
    /// makes the bundle fail rather than being trusted.
    pub fn verify_against(&self, root: &Hash, config: &MerkleConfig) -> Result<bool> {
        let leaf = leaf_hash(&self.record, config)?;
        if !crypto::verify_hash(&self.leaf, &leaf) {
            debug!(
                "bundle leaf {} does not match record {}",
                crypto::to_hex_prefixed(&self.leaf),
                self.record.serial_number
            );
            return Ok(false);
        }
        Ok(merkle::verify(&leaf, &self.proof, root, config))
    }
}
