//! Utility functions and helpers
//!
//! This module provides small helpers shared by the tree, proof and batch code.

use std::time::Instant;
use log::debug;

/// Measure execution time of a closure
pub fn measure_time<F, T>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    debug!("{} took {}us", name, elapsed.as_micros());
    result
}

/// Serde adapter writing a 32-byte hash as a `0x`-prefixed hex string
pub mod hex_hash {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::crypto::{parse_hash, to_hex_prefixed, Hash};

    /// Serialize as `0x…`
    pub fn serialize<S>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_hex_prefixed(hash))
    }

    /// Deserialize from hex with or without the `0x` prefix
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Hash, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse_hash(&text, "hash").map_err(D::Error::custom)
    }
}
