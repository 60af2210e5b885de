//! # MedChain Core
//!
//! Merkle commitments for pharmaceutical batches. A batch of drug records is
//! canonically encoded, hashed into leaves and committed under a single root
//! that is anchored externally. Any single record can later be proven to
//! belong to the batch without revealing the other records.
//!
//! Data flows one way at build time (records → leaves → tree → root) and one
//! way at verification time (record + proof + claimed root → boolean).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod batch;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod merkle;
pub mod models;
pub mod utils;

/// Re-export common types for ease of use
pub use batch::{verify_batch_integrity, verify_record, verify_record_hex, BatchIndex, DrugBatch, ProofBundle};
pub use config::{CoreConfig, MerkleConfig};
pub use crypto::{Hash, HashAlgorithm, SecureHasher};
pub use encoding::{encode_record, leaf_hash, EncodingScheme};
pub use error::{CoreError, Result};
pub use merkle::{MerkleProof, MerkleTree, PairOrdering, ProofDirection, ProofItem};
pub use models::DrugRecord;

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
