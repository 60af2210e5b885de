//! Drug batches: records, their tree and the leaf index
//!
//! This is the record-level entry point. Callers hold `DrugRecord`s rather
//! than hashes, so every operation here encodes and hashes records with the
//! batch's `MerkleConfig` before touching the tree.

mod bundle;
mod index;

pub use bundle::ProofBundle;
pub use index::BatchIndex;

use log::debug;

use crate::config::MerkleConfig;
use crate::crypto::{self, Hash};
use crate::encoding::leaf_hash;
use crate::error::{CoreError, Result};
use crate::merkle::{self, MerkleProof, MerkleTree, ProofItem};
use crate::models::DrugRecord;

/// A committed batch of drug records
#[derive(Debug, Clone)]
pub struct DrugBatch {
    records: Vec<DrugRecord>,
    tree: MerkleTree,
    index: BatchIndex,
}

impl DrugBatch {
    /// Encode, hash and commit `records` in the given order
    pub fn new(records: Vec<DrugRecord>, config: MerkleConfig) -> Result<Self> {
        let leaves = leaves_for(&records, &config)?;
        let index = BatchIndex::new(&leaves);

        if config.reject_duplicate_records && index.len() != leaves.len() {
            let duplicate = leaves
                .iter()
                .enumerate()
                .find(|(position, leaf)| index.position_of(leaf) != Some(*position))
                .map(|(position, _)| records[position].serial_number.clone())
                .unwrap_or_default();
            return Err(CoreError::DuplicateRecord(duplicate));
        }

        let tree = MerkleTree::from_leaves(leaves, config)?;
        debug!("committed batch of {} records, root {}", records.len(), tree.root_hex());

        Ok(DrugBatch { records, tree, index })
    }

    /// Records in commitment order
    pub fn records(&self) -> &[DrugRecord] {
        &self.records
    }

    /// The underlying tree
    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    /// Rules the batch was committed with
    pub fn config(&self) -> &MerkleConfig {
        self.tree.config()
    }

    /// Root hash
    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    /// Root as `0x` hex, the value anchored on the ledger
    pub fn root_hex(&self) -> String {
        self.tree.root_hex()
    }

    /// Leaves as unprefixed hex
    pub fn leaves_hex(&self) -> Vec<String> {
        self.tree.leaves_hex()
    }

    /// Leaf hash of any record under this batch's rules
    pub fn leaf_for(&self, record: &DrugRecord) -> Result<Hash> {
        leaf_hash(record, self.config())
    }

    /// Record whose leaf is `leaf`
    pub fn find_by_hash(&self, leaf: &Hash) -> Option<&DrugRecord> {
        self.index.position_of(leaf).map(|position| &self.records[position])
    }

    /// Record whose leaf is the hex string `leaf_hex`
    ///
    /// Text that is not a hash cannot match anything, so it is reported as absent.
    pub fn find_by_hex(&self, leaf_hex: &str) -> Option<&DrugRecord> {
        crypto::parse_hash(leaf_hex, "leaf")
            .ok()
            .and_then(|leaf| self.find_by_hash(&leaf))
    }

    /// Stored record equal in commitment to `record`
    pub fn find_record(&self, record: &DrugRecord) -> Result<Option<&DrugRecord>> {
        Ok(self.find_by_hash(&self.leaf_for(record)?))
    }

    /// Proof for the first occurrence of `record`
    pub fn proof_for(&self, record: &DrugRecord) -> Result<MerkleProof> {
        let leaf = self.leaf_for(record)?;
        let position = self
            .index
            .position_of(&leaf)
            .ok_or_else(|| CoreError::LeafNotFound(crypto::to_hex_prefixed(&leaf)))?;
        self.tree.proof_at(position)
    }

    /// Proof as a plain hex sibling list
    pub fn proof_hex_for(&self, record: &DrugRecord) -> Result<Vec<String>> {
        Ok(self.proof_for(record)?.to_hex())
    }

    /// Full proof artifact for the record at `position`
    pub fn proof_bundle_at(&self, position: usize) -> Result<ProofBundle> {
        let proof = self.tree.proof_at(position)?;
        Ok(ProofBundle {
            record: self.records[position].clone(),
            leaf: proof.leaf,
            root: self.root(),
            proof: proof.items,
        })
    }

    /// Full proof artifact for the first occurrence of `record`
    pub fn proof_bundle(&self, record: &DrugRecord) -> Result<ProofBundle> {
        let position = self.proof_for(record)?.position;
        self.proof_bundle_at(position)
    }

    /// Verify a record and proof against this batch's root
    pub fn verify(&self, record: &DrugRecord, proof: &[ProofItem]) -> Result<bool> {
        verify_record(record, proof, &self.root(), self.config())
    }
}

fn leaves_for(records: &[DrugRecord], config: &MerkleConfig) -> Result<Vec<Hash>> {
    records.iter().map(|record| leaf_hash(record, config)).collect()
}

/// Verify that `record` is committed under `root` by `proof`
pub fn verify_record(
    record: &DrugRecord,
    proof: &[ProofItem],
    root: &Hash,
    config: &MerkleConfig,
) -> Result<bool> {
    let leaf = leaf_hash(record, config)?;
    Ok(merkle::verify(&leaf, proof, root, config))
}

/// Verify a record against a plain hex proof and hex root
pub fn verify_record_hex<S: AsRef<str>>(
    record: &DrugRecord,
    proof_hex: &[S],
    root_hex: &str,
    config: &MerkleConfig,
) -> Result<bool> {
    let leaf = leaf_hash(record, config)?;
    merkle::verify_hex(&crypto::to_hex_prefixed(&leaf), proof_hex, root_hex, config)
}

/// Rebuild the tree over `records` and compare with a published root
pub fn verify_batch_integrity(
    records: &[DrugRecord],
    root_hex: &str,
    config: &MerkleConfig,
) -> Result<bool> {
    let expected = crypto::parse_hash(root_hex, "root")?;
    let tree = MerkleTree::from_leaves(leaves_for(records, config)?, *config)?;
    Ok(crypto::verify_hash(&expected, &tree.root()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_batch;
    use chrono::{TimeZone, Utc};

    fn records(n: usize) -> Vec<DrugRecord> {
        sample_batch(n, "Paracetamol", Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap())
    }

    #[test]
    fn test_empty_batch() {
        assert!(matches!(
            DrugBatch::new(Vec::new(), MerkleConfig::default()),
            Err(CoreError::EmptyTree)
        ));
    }

    #[test]
    fn test_bad_record_fails_whole_batch() {
        let mut batch = records(3);
        batch[1].serial_number.clear();
        assert!(matches!(
            DrugBatch::new(batch, MerkleConfig::default()),
            Err(CoreError::Encoding(_))
        ));
    }

    #[test]
    fn test_record_round_trip() {
        let batch = DrugBatch::new(records(5), MerkleConfig::default()).unwrap();

        for record in batch.records() {
            let proof = batch.proof_for(record).unwrap();
            assert!(batch.verify(record, &proof.items).unwrap());

            let hex_proof = batch.proof_hex_for(record).unwrap();
            assert!(verify_record_hex(record, &hex_proof, &batch.root_hex(), batch.config()).unwrap());
        }
    }

    #[test]
    fn test_foreign_record_not_found() {
        let batch = DrugBatch::new(records(4), MerkleConfig::default()).unwrap();
        let stranger = records(5).remove(4);

        assert!(matches!(batch.proof_for(&stranger), Err(CoreError::LeafNotFound(_))));
        assert!(batch.find_record(&stranger).unwrap().is_none());
    }

    #[test]
    fn test_sub_millisecond_variant_is_not_matched() {
        let batch = DrugBatch::new(records(4), MerkleConfig::default()).unwrap();
        let committed = &batch.records()[1];
        let proof = batch.proof_for(committed).unwrap();

        let mut variant = committed.clone();
        variant.manufacture_date = variant.manufacture_date + chrono::Duration::microseconds(250);
        assert_ne!(&variant, committed);

        assert!(matches!(batch.find_record(&variant), Err(CoreError::Encoding(_))));
        assert!(matches!(batch.verify(&variant, &proof.items), Err(CoreError::Encoding(_))));
        assert!(matches!(batch.proof_for(&variant), Err(CoreError::Encoding(_))));
    }

    #[test]
    fn test_lookup_by_hash() {
        let batch = DrugBatch::new(records(4), MerkleConfig::default()).unwrap();
        let leaves = batch.leaves_hex();

        assert_eq!(batch.find_by_hex(&leaves[2]), Some(&batch.records()[2]));
        assert_eq!(batch.find_by_hex(&format!("0x{}", leaves[3])), Some(&batch.records()[3]));
        assert_eq!(batch.find_by_hex("deadbeef"), None);
        assert_eq!(batch.find_by_hash(&[0u8; 32]), None);
    }

    #[test]
    fn test_duplicates_allowed_by_default() {
        let mut batch = records(3);
        batch.push(batch[0].clone());
        let batch = DrugBatch::new(batch, MerkleConfig::default()).unwrap();

        assert_eq!(batch.tree().num_leaves(), 4);
        assert_eq!(batch.proof_for(&batch.records()[3]).unwrap().position, 0);
        assert!(batch.proof_bundle_at(3).unwrap().verify(batch.config()).unwrap());
    }

    #[test]
    fn test_duplicates_rejected_when_strict() {
        let mut batch = records(3);
        batch.push(batch[1].clone());
        let config = MerkleConfig {
            reject_duplicate_records: true,
            ..MerkleConfig::default()
        };

        match DrugBatch::new(batch.clone(), config) {
            Err(CoreError::DuplicateRecord(serial)) => assert_eq!(serial, batch[1].serial_number),
            other => panic!("Expected DuplicateRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_bundle_round_trip_and_tamper() {
        let batch = DrugBatch::new(records(5), MerkleConfig::default()).unwrap();
        let bundle = batch.proof_bundle(&batch.records()[2]).unwrap();

        let json = bundle.to_json_pretty().unwrap();
        let parsed = ProofBundle::from_json(&json).unwrap();
        assert_eq!(parsed, bundle);
        assert!(parsed.verify(batch.config()).unwrap());
        assert_eq!(parsed.root_hex(), batch.root_hex());

        let mut tampered = parsed.clone();
        tampered.record.expiry_date = tampered.record.expiry_date + chrono::Duration::days(30);
        assert!(!tampered.verify(batch.config()).unwrap());

        let other_root = DrugBatch::new(records(6), MerkleConfig::default()).unwrap().root();
        assert!(!parsed.verify_against(&other_root, batch.config()).unwrap());
    }

    #[test]
    fn test_malformed_bundle() {
        assert!(matches!(
            ProofBundle::from_json(r#"{"record": {}, "leaf": "0x12"}"#),
            Err(CoreError::MalformedProof(_))
        ));
    }

    #[test]
    fn test_batch_integrity() {
        let batch_records = records(5);
        let batch = DrugBatch::new(batch_records.clone(), MerkleConfig::default()).unwrap();
        let config = MerkleConfig::default();

        assert!(verify_batch_integrity(&batch_records, &batch.root_hex(), &config).unwrap());

        let mut altered = batch_records.clone();
        altered[0].manufacturer = "Other Pharma".to_string();
        assert!(!verify_batch_integrity(&altered, &batch.root_hex(), &config).unwrap());

        assert!(matches!(
            verify_batch_integrity(&batch_records, "0x00", &config),
            Err(CoreError::MalformedProof(_))
        ));
    }
}
