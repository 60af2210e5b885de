//! Configuration for the core crate
//!
//! A `MerkleConfig` pins every rule that influences a root: hash function,
//! pair ordering and record encoding. Builder and verifier must be handed the
//! same value, otherwise verification silently returns `false`.

use serde::{Serialize, Deserialize};

use crate::crypto::HashAlgorithm;
use crate::encoding::EncodingScheme;
use crate::error::{CoreError, Result};
use crate::merkle::PairOrdering;

/// Merkle tree configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerkleConfig {
    /// Hash algorithm used for leaves and internal nodes
    pub hash_algorithm: HashAlgorithm,

    /// How two siblings are ordered before hashing
    pub pair_ordering: PairOrdering,

    /// Canonical record encoding
    pub encoding: EncodingScheme,

    /// Whether a batch with two identical records is rejected
    pub reject_duplicate_records: bool,
}

impl Default for MerkleConfig {
    fn default() -> Self {
        MerkleConfig {
            hash_algorithm: HashAlgorithm::default(),
            pair_ordering: PairOrdering::default(),
            encoding: EncodingScheme::default(),
            reject_duplicate_records: false,
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Merkle tree configuration
    pub merkle: MerkleConfig,

    /// Log level
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            merkle: MerkleConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl CoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| CoreError::Config(format!("cannot open {}: {}", path, e)))?;

        let config = serde_json::from_reader(file)?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;

        serde_json::to_writer_pretty(file, self)?;

        Ok(())
    }

    /// Create a development configuration
    pub fn development() -> Self {
        let mut config = Self::default();
        config.log_level = "debug".to_string();
        config
    }

    /// Create a configuration that refuses duplicate records in a batch
    pub fn strict() -> Self {
        let mut config = Self::default();
        config.merkle.reject_duplicate_records = true;
        config
    }
}
