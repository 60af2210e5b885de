//! Subcommand implementations
//!
//! Output goes to the supplied writer (stdout in the binary); logs go to
//! stderr through tracing.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use medchain_core::crypto::{parse_hash, to_hex_prefixed};
use medchain_core::models::{batch_from_json, sample_batch, who_approval_hash};
use medchain_core::{
    verify_batch_integrity, verify_record_hex, CoreConfig, CoreError, DrugBatch, DrugRecord,
    PairOrdering, ProofBundle,
};

use crate::cli::Command;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "MEDCHAIN_CONFIG";

/// Result of a command, mapped to the process exit code by `main`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Verified,
    NotVerified,
}

/// Audit line printed for every verification
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerificationRecord<'a> {
    subject: &'a str,
    root: String,
    verified: bool,
    checked_at: String,
}

pub fn load_config(path: Option<&Path>) -> Result<CoreConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::var_os(CONFIG_ENV).map(Into::into),
    };

    match path {
        Some(path) => CoreConfig::from_file(&path.to_string_lossy())
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(CoreConfig::default()),
    }
}

/// Whether `err` comes from input that is not a well-formed record, proof or hash
pub fn is_malformed_input(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CoreError>()
        .map_or(false, CoreError::is_malformed_input)
}

fn read_batch(path: &Path) -> Result<Vec<DrugRecord>> {
    let json = fs::read_to_string(path).with_context(|| format!("reading batch {}", path.display()))?;
    Ok(batch_from_json(&json).with_context(|| format!("parsing batch {}", path.display()))?)
}

fn read_record(path: &Path) -> Result<DrugRecord> {
    let json = fs::read_to_string(path).with_context(|| format!("reading record {}", path.display()))?;
    Ok(DrugRecord::from_json(&json).with_context(|| format!("parsing record {}", path.display()))?)
}

/// A proof file is a JSON array of hex sibling hashes
fn read_hex_proof(path: &Path) -> Result<Vec<String>> {
    let json = fs::read_to_string(path).with_context(|| format!("reading proof {}", path.display()))?;
    let proof: Vec<String> = serde_json::from_str(&json)
        .map_err(|e| CoreError::MalformedProof(format!("proof list: {}", e)))
        .with_context(|| format!("parsing proof {}", path.display()))?;
    Ok(proof)
}

fn emit(out: &mut dyn Write, target: Option<&Path>, text: &str) -> Result<()> {
    match target {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("wrote {}", path.display());
        }
        None => writeln!(out, "{}", text)?,
    }
    Ok(())
}

fn report(out: &mut dyn Write, subject: &str, root: String, verified: bool) -> Result<Outcome> {
    let record = VerificationRecord {
        subject,
        root,
        verified,
        checked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    writeln!(out, "{}", serde_json::to_string(&record)?)?;
    writeln!(out, "{}", if verified { "verified" } else { "not verified" })?;

    Ok(if verified { Outcome::Verified } else { Outcome::NotVerified })
}

pub fn run(command: Command, config: &CoreConfig, out: &mut dyn Write) -> Result<Outcome> {
    let merkle = config.merkle;

    match command {
        Command::Sample { count, name, out: target } => {
            let records = sample_batch(count, &name, Utc::now());
            tracing::info!("generated {} sample records of {}", records.len(), name);
            emit(out, target.as_deref(), &serde_json::to_string_pretty(&records)?)?;
            Ok(Outcome::Done)
        }

        Command::Root { batch } => {
            let batch = DrugBatch::new(read_batch(&batch)?, merkle)?;
            writeln!(out, "{}", batch.root_hex())?;
            Ok(Outcome::Done)
        }

        Command::Leaves { batch } => {
            let batch = DrugBatch::new(read_batch(&batch)?, merkle)?;
            for (leaf, record) in batch.leaves_hex().iter().zip(batch.records()) {
                writeln!(out, "{}  {}", leaf, record.serial_number)?;
            }
            Ok(Outcome::Done)
        }

        Command::Proof { batch, serial, index, hex, out: target } => {
            let batch = DrugBatch::new(read_batch(&batch)?, merkle)?;
            let position = match (serial, index) {
                (_, Some(index)) => index,
                (Some(serial), None) => batch
                    .records()
                    .iter()
                    .position(|record| record.serial_number == serial)
                    .ok_or_else(|| anyhow!("no record with serial number {}", serial))?,
                (None, None) => return Err(anyhow!("either --serial or --index is required")),
            };

            if hex {
                if merkle.pair_ordering != PairOrdering::Sorted {
                    return Err(anyhow!("hex proofs carry no sides and need sorted pair ordering"));
                }
                let record = batch
                    .records()
                    .get(position)
                    .ok_or_else(|| anyhow!("batch has no record at position {}", position))?;
                let proof = batch.proof_hex_for(record)?;
                tracing::info!("hex proof for {} has {} siblings", record.serial_number, proof.len());
                emit(out, target.as_deref(), &serde_json::to_string_pretty(&proof)?)?;
                return Ok(Outcome::Done);
            }

            let bundle = batch.proof_bundle_at(position)?;
            tracing::info!(
                "proof for {} has {} siblings under root {}",
                bundle.record.serial_number,
                bundle.proof.len(),
                bundle.root_hex()
            );
            emit(out, target.as_deref(), &bundle.to_json_pretty()?)?;
            Ok(Outcome::Done)
        }

        Command::Verify { bundle, root } => {
            let json = fs::read_to_string(&bundle)
                .with_context(|| format!("reading bundle {}", bundle.display()))?;
            let bundle = ProofBundle::from_json(&json)?;
            let root = match root {
                Some(root) => parse_hash(&root, "root")?,
                None => bundle.root,
            };

            let verified = bundle.verify_against(&root, &merkle)?;
            tracing::info!("record {} verified: {}", bundle.record.serial_number, verified);
            report(out, &bundle.record.serial_number, to_hex_prefixed(&root), verified)
        }

        Command::VerifyRecord { record, proof, root } => {
            let record = read_record(&record)?;
            let proof = read_hex_proof(&proof)?;
            let root = to_hex_prefixed(&parse_hash(&root, "root")?);

            let verified = verify_record_hex(&record, &proof, &root, &merkle)?;
            tracing::info!("record {} verified: {}", record.serial_number, verified);
            report(out, &record.serial_number, root, verified)
        }

        Command::Integrity { batch, root } => {
            let records = read_batch(&batch)?;
            let root = to_hex_prefixed(&parse_hash(&root, "root")?);
            let verified = verify_batch_integrity(&records, &root, &merkle)?;
            tracing::info!("batch {} integrity: {}", batch.display(), verified);
            report(out, &batch.display().to_string(), root, verified)
        }

        Command::WhoHash { name, year } => {
            writeln!(out, "{}", who_approval_hash(&name, year))?;
            Ok(Outcome::Done)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn run_to_string(command: Command) -> (Result<Outcome>, String) {
        let mut out = Vec::new();
        let outcome = run(command, &CoreConfig::default(), &mut out);
        (outcome, String::from_utf8(out).unwrap())
    }

    #[fixture]
    fn dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn write_sample(dir: &TempDir, count: usize) -> PathBuf {
        let path = dir.path().join("batch.json");
        let (outcome, _) = run_to_string(Command::Sample {
            count,
            name: "Paracetamol".to_string(),
            out: Some(path.clone()),
        });
        assert_eq!(outcome.unwrap(), Outcome::Done);
        path
    }

    fn write_proof(dir: &TempDir, batch: &Path, index: usize, hex: bool) -> PathBuf {
        let path = dir.path().join(format!("proof-{}-{}.json", index, hex));
        let (outcome, _) = run_to_string(Command::Proof {
            batch: batch.to_path_buf(),
            serial: None,
            index: Some(index),
            hex,
            out: Some(path.clone()),
        });
        assert_eq!(outcome.unwrap(), Outcome::Done);
        path
    }

    fn write_record(dir: &TempDir, record: &DrugRecord) -> PathBuf {
        let path = dir.path().join("record.json");
        fs::write(&path, serde_json::to_string(record).unwrap()).unwrap();
        path
    }

    fn batch_root(batch: &Path) -> String {
        let (_, root) = run_to_string(Command::Root { batch: batch.to_path_buf() });
        root.trim().to_string()
    }

    #[rstest]
    fn test_root_is_stable(dir: TempDir) {
        let batch = write_sample(&dir, 5);

        let first = batch_root(&batch);
        assert_eq!(first, batch_root(&batch));
        assert!(first.starts_with("0x"));
        assert_eq!(first.len(), 66);
    }

    #[rstest]
    fn test_leaves_lists_every_record(dir: TempDir) {
        let batch = write_sample(&dir, 4);

        let (_, output) = run_to_string(Command::Leaves { batch });
        assert_eq!(output.lines().count(), 4);
    }

    #[rstest]
    #[case::own_root(None, Outcome::Verified, "verified")]
    #[case::other_root(Some(format!("0x{}", "11".repeat(32))), Outcome::NotVerified, "not verified")]
    fn test_verify_bundle(
        dir: TempDir,
        #[case] root: Option<String>,
        #[case] expected: Outcome,
        #[case] last_line: &str,
    ) {
        let batch = write_sample(&dir, 5);
        let bundle = write_proof(&dir, &batch, 2, false);

        let (outcome, output) = run_to_string(Command::Verify { bundle, root });
        assert_eq!(outcome.unwrap(), expected);
        assert_eq!(output.lines().last(), Some(last_line));
    }

    #[rstest]
    fn test_proof_by_serial(dir: TempDir) {
        let batch = write_sample(&dir, 3);
        let records = read_batch(&batch).unwrap();

        let (outcome, output) = run_to_string(Command::Proof {
            batch: batch.clone(),
            serial: Some(records[1].serial_number.clone()),
            index: None,
            hex: false,
            out: None,
        });
        assert_eq!(outcome.unwrap(), Outcome::Done);
        let bundle = ProofBundle::from_json(&output).unwrap();
        assert_eq!(bundle.record, records[1]);

        let (outcome, _) = run_to_string(Command::Proof {
            batch,
            serial: Some("SN-missing".to_string()),
            index: None,
            hex: false,
            out: None,
        });
        assert!(outcome.is_err());
    }

    #[rstest]
    fn test_hex_proof_lists_siblings(dir: TempDir) {
        let batch = write_sample(&dir, 5);
        let proof = write_proof(&dir, &batch, 4, true);

        let siblings: Vec<String> = serde_json::from_str(&fs::read_to_string(proof).unwrap()).unwrap();
        assert_eq!(siblings.len(), 1);
        assert!(siblings[0].starts_with("0x"));

        let (outcome, _) = run_to_string(Command::Proof {
            batch,
            serial: None,
            index: Some(5),
            hex: true,
            out: None,
        });
        assert!(outcome.is_err());
    }

    #[rstest]
    #[case::committed(1, None, Outcome::Verified)]
    #[case::proof_of_another_record(1, Some(3), Outcome::NotVerified)]
    fn test_verify_record_with_hex_proof(
        dir: TempDir,
        #[case] index: usize,
        #[case] proof_index: Option<usize>,
        #[case] expected: Outcome,
    ) {
        let batch = write_sample(&dir, 5);
        let records = read_batch(&batch).unwrap();
        let record = write_record(&dir, &records[index]);
        let proof = write_proof(&dir, &batch, proof_index.unwrap_or(index), true);

        // Unprefixed upper-case roots are accepted and reported normalised
        let root = batch_root(&batch);
        let loose_root = root.trim_start_matches("0x").to_uppercase();

        let (outcome, output) = run_to_string(Command::VerifyRecord { record, proof, root: loose_root });
        assert_eq!(outcome.unwrap(), expected);
        assert!(output.contains(&format!("\"root\":\"{}\"", root)));
    }

    #[rstest]
    fn test_verify_record_rejects_malformed_proof(dir: TempDir) {
        let batch = write_sample(&dir, 2);
        let records = read_batch(&batch).unwrap();
        let record = write_record(&dir, &records[0]);
        let root = batch_root(&batch);

        for bad in [r#"["0x12"]"#, r#"{"proof": []}"#] {
            let proof = dir.path().join("bad-proof.json");
            fs::write(&proof, bad).unwrap();

            let (outcome, output) = run_to_string(Command::VerifyRecord {
                record: record.clone(),
                proof,
                root: root.clone(),
            });
            let err = outcome.unwrap_err();
            assert!(is_malformed_input(&err), "{:#}", err);
            assert!(output.is_empty());
        }
    }

    #[rstest]
    fn test_malformed_bundle_is_an_error(dir: TempDir) {
        let bundle = dir.path().join("bundle.json");
        fs::write(&bundle, r#"{"proof": ["0x12"]}"#).unwrap();

        let (outcome, output) = run_to_string(Command::Verify { bundle, root: None });
        assert!(is_malformed_input(&outcome.unwrap_err()));
        assert!(output.is_empty());
    }

    #[rstest]
    fn test_missing_file_is_not_malformed_input(dir: TempDir) {
        let (outcome, _) = run_to_string(Command::Root { batch: dir.path().join("missing.json") });
        assert!(!is_malformed_input(&outcome.unwrap_err()));
    }

    #[rstest]
    #[case::published_root(true, Outcome::Verified)]
    #[case::zero_root(false, Outcome::NotVerified)]
    fn test_integrity(dir: TempDir, #[case] use_batch_root: bool, #[case] expected: Outcome) {
        let batch = write_sample(&dir, 6);
        let root = if use_batch_root {
            batch_root(&batch)
        } else {
            format!("0x{}", "00".repeat(32))
        };

        // The audit line carries the normalised root whatever form was given
        let (outcome, output) = run_to_string(Command::Integrity {
            batch,
            root: root.trim_start_matches("0x").to_uppercase(),
        });
        assert_eq!(outcome.unwrap(), expected);
        assert!(output.contains(&format!("\"root\":\"{}\"", root)));
    }

    #[rstest]
    fn test_who_hash() {
        let (_, output) = run_to_string(Command::WhoHash {
            name: "Paracetamol".to_string(),
            year: 2024,
        });
        assert_eq!(output.trim(), who_approval_hash("Paracetamol", 2024));
    }

    #[rstest]
    fn test_load_config_from_file(dir: TempDir) {
        let path = dir.path().join("medchain.json");
        CoreConfig::strict().to_file(&path.to_string_lossy()).unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert!(config.merkle.reject_duplicate_records);

        assert!(load_config(Some(dir.path().join("missing.json").as_path())).is_err());
    }
}
