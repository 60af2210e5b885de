//! Canonical encoding of drug records
//!
//! The bytes produced here feed the leaf hash, so they must be identical across
//! runs and implementations. Both schemes are written out field by field in a
//! fixed order; neither relies on a generic struct serializer.
//!
//! `Json` yields exactly the bytes of a JavaScript `JSON.stringify` over an
//! object literal with keys in the order below, so roots produced by existing
//! web tooling remain reproducible:
//!
//! ```text
//! {"name":..,"batchNumber":..,"manufacturer":..,"manufactureDate":..,
//!  "expiryDate":..,"serialNumber":..,"additionalData":..}
//! ```

use chrono::{DateTime, Datelike, Utc};
use serde::{Serialize, Deserialize};

use crate::config::MerkleConfig;
use crate::crypto::Hash;
use crate::error::{to_encoding_error, CoreError, Result};
use crate::models::{format_timestamp, DrugRecord};

/// Version tag that opens every length-prefixed encoding
pub const LENGTH_PREFIXED_TAG: u8 = 0x01;

/// Record encoding scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncodingScheme {
    /// Fixed-key-order compact JSON object
    #[default]
    Json,

    /// Tag byte, then `u32` big-endian length + UTF-8 bytes per field
    LengthPrefixed,
}

/// Encode a record into its canonical bytes
pub fn encode_record(record: &DrugRecord, scheme: EncodingScheme) -> Result<Vec<u8>> {
    let fields = canonical_fields(record)?;

    match scheme {
        EncodingScheme::Json => encode_json(&fields),
        EncodingScheme::LengthPrefixed => encode_length_prefixed(&fields),
    }
}

/// Hash a record into its leaf value
pub fn leaf_hash(record: &DrugRecord, config: &MerkleConfig) -> Result<Hash> {
    let encoded = encode_record(record, config.encoding)?;
    Ok(config.hash_algorithm.hasher().hash(&encoded))
}

/// The seven committed fields, validated and rendered, in commitment order
fn canonical_fields(record: &DrugRecord) -> Result<[(&'static str, String); 7]> {
    require_text("name", &record.name)?;
    require_text("batchNumber", &record.batch_number)?;
    require_text("manufacturer", &record.manufacturer)?;
    require_text("serialNumber", &record.serial_number)?;

    Ok([
        ("name", record.name.clone()),
        ("batchNumber", record.batch_number.clone()),
        ("manufacturer", record.manufacturer.clone()),
        ("manufactureDate", render_timestamp("manufactureDate", &record.manufacture_date)?),
        ("expiryDate", render_timestamp("expiryDate", &record.expiry_date)?),
        ("serialNumber", record.serial_number.clone()),
        ("additionalData", record.additional_data.clone()),
    ])
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CoreError::Encoding(format!("required field {} is empty", field)));
    }
    Ok(())
}

fn render_timestamp(field: &str, value: &DateTime<Utc>) -> Result<String> {
    // Outside four-digit years the ISO rendering switches to an expanded form.
    if !(0..=9999).contains(&value.year()) {
        return Err(CoreError::Encoding(format!(
            "{} year {} is outside 0000-9999",
            field,
            value.year()
        )));
    }
    // The rendering stops at milliseconds; anything finer would be dropped
    // and two distinct records would share a leaf.
    if value.timestamp_subsec_nanos() % 1_000_000 != 0 {
        return Err(CoreError::Encoding(format!(
            "{} {} has sub-millisecond precision",
            field,
            value.to_rfc3339()
        )));
    }
    Ok(format_timestamp(value))
}

fn encode_json(fields: &[(&'static str, String)]) -> Result<Vec<u8>> {
    let mut out = String::with_capacity(256);
    out.push('{');
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(key);
        out.push_str("\":");
        out.push_str(&serde_json::to_string(value.as_str()).map_err(to_encoding_error)?);
    }
    out.push('}');
    Ok(out.into_bytes())
}

fn encode_length_prefixed(fields: &[(&'static str, String)]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(1 + fields.iter().map(|(_, v)| 4 + v.len()).sum::<usize>());
    out.push(LENGTH_PREFIXED_TAG);
    for (key, value) in fields {
        let len = u32::try_from(value.len())
            .map_err(|_| CoreError::Encoding(format!("{} is longer than u32::MAX bytes", key)))?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(value.as_bytes());
    }
    Ok(out)
}
