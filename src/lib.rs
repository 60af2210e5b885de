/// MedChain - Merkle commitments for pharmaceutical supply-chain batches
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `medchain-core`: canonical encoding, Merkle tree, proofs and verification
/// - `medchain-verification`: command-line tool for building roots and checking proofs

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
