use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Commit drug batches to a Merkle root and check membership proofs
#[derive(Debug, Parser)]
#[command(name = "medchain-verify", version, about)]
pub struct Cli {
    /// JSON configuration file (falls back to $MEDCHAIN_CONFIG, then defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a demo batch
    Sample {
        #[arg(long, default_value_t = 10)]
        count: usize,

        #[arg(long, default_value = "Paracetamol")]
        name: String,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the root of a batch file
    Root { batch: PathBuf },

    /// Print the leaf hashes of a batch file
    Leaves { batch: PathBuf },

    /// Produce a proof bundle for one record of a batch
    Proof {
        batch: PathBuf,

        /// Select the record by serial number (first match)
        #[arg(long, required_unless_present = "index", conflicts_with = "index")]
        serial: Option<String>,

        /// Select the record by position
        #[arg(long)]
        index: Option<usize>,

        /// Write only the sibling hashes as a JSON array of hex strings
        #[arg(long)]
        hex: bool,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Verify a proof bundle
    Verify {
        bundle: PathBuf,

        /// Published root to check against instead of the bundle's own
        #[arg(long)]
        root: Option<String>,
    },

    /// Verify a record file against a hex sibling list and a published root
    VerifyRecord {
        record: PathBuf,

        /// JSON array of hex sibling hashes
        #[arg(long)]
        proof: PathBuf,

        #[arg(long)]
        root: String,
    },

    /// Rebuild a batch and compare with a published root
    Integrity {
        batch: PathBuf,

        #[arg(long)]
        root: String,
    },

    /// Reference hash of a WHO-approved drug
    WhoHash {
        #[arg(long)]
        name: String,

        #[arg(long, default_value_t = 2024)]
        year: u32,
    },
}
