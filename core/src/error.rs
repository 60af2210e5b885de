//! Error types for the core crate
//!
//! Every error here is a deterministic input or structure failure. None of them
//! is transient, so callers should surface them instead of retrying.

use thiserror::Error;
use std::io;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// A drug record is missing a required field or cannot be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The tree builder was handed zero leaves
    #[error("Cannot build a Merkle tree from an empty batch")]
    EmptyTree,

    /// A proof was requested for a leaf that is not in the tree
    #[error("Leaf not found in tree: {0}")]
    LeafNotFound(String),

    /// A proof, leaf or root is not a well-formed 32-byte hash
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// Two records in a batch produced the same leaf under strict configuration
    #[error("Duplicate record in batch: {0}")]
    DuplicateRecord(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cached tree data is inconsistent
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bincode error
    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Hex decoding error
    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl CoreError {
    /// Whether this error is a verification-input failure ("could not check"),
    /// as opposed to a failure to build or load something.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, CoreError::MalformedProof(_) | CoreError::Encoding(_))
    }
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, CoreError>;

/// Convert a displayable error to an Encoding error
pub fn to_encoding_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::Encoding(err.to_string())
}

/// Convert a displayable error to a MalformedProof error
pub fn to_malformed_proof_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::MalformedProof(err.to_string())
}
