//! Drug record representation
//!
//! A `DrugRecord` is one physical unit or lot committed into a batch. Records
//! are immutable once built; a changed record is a different leaf.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::crypto;
use crate::error::{to_encoding_error, Result};

/// One drug unit in a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugRecord {
    /// Drug name
    pub name: String,

    /// Batch number
    pub batch_number: String,

    /// Manufacturer name
    pub manufacturer: String,

    /// Manufacture timestamp
    #[serde(with = "timestamp")]
    pub manufacture_date: DateTime<Utc>,

    /// Expiry timestamp
    #[serde(with = "timestamp")]
    pub expiry_date: DateTime<Utc>,

    /// Serial number, intended to be unique within a batch
    pub serial_number: String,

    /// Free-form metadata (dosage, form, storage...). Absent and `null` both
    /// become the empty string.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub additional_data: String,
}

impl DrugRecord {
    /// Create a record with empty additional data
    pub fn new(
        name: impl Into<String>,
        batch_number: impl Into<String>,
        manufacturer: impl Into<String>,
        manufacture_date: DateTime<Utc>,
        expiry_date: DateTime<Utc>,
        serial_number: impl Into<String>,
    ) -> Self {
        DrugRecord {
            name: name.into(),
            batch_number: batch_number.into(),
            manufacturer: manufacturer.into(),
            manufacture_date,
            expiry_date,
            serial_number: serial_number.into(),
            additional_data: String::new(),
        }
    }

    /// Attach additional data
    pub fn with_additional_data(mut self, additional_data: impl Into<String>) -> Self {
        self.additional_data = additional_data.into();
        self
    }

    /// Parse a single record from JSON. Missing required fields are encoding errors.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(to_encoding_error)
    }
}

/// Parse a batch (JSON array of records)
pub fn batch_from_json(json: &str) -> Result<Vec<DrugRecord>> {
    serde_json::from_str(json).map_err(to_encoding_error)
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps are written as ISO-8601 with millisecond precision and read
/// from either ISO-8601 strings or epoch milliseconds.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    /// Serialize as `YYYY-MM-DDTHH:MM:SS.mmmZ`
    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Deserialize from an RFC 3339 string or epoch milliseconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| D::Error::custom(format!("invalid timestamp {:?}: {}", text, e))),
            Raw::Millis(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", millis))),
        }
    }
}

#[derive(Serialize)]
struct SampleDetails {
    dosage: &'static str,
    form: &'static str,
    storage: &'static str,
    lot: String,
}

/// Generate a demo batch of `count` records of `drug_name` manufactured at `base`.
///
/// Batch numbers are `NAME-001`, `NAME-002`, ..., expiry is one year after
/// manufacture and serial numbers are `SN{base millis}{i}`. `base` is
/// truncated to whole milliseconds so the records are always encodable.
pub fn sample_batch(count: usize, drug_name: &str, base: DateTime<Utc>) -> Vec<DrugRecord> {
    let base = truncate_to_millis(base);
    let expiry = base + Duration::days(365);
    let prefix = drug_name.to_uppercase();

    (1..=count)
        .map(|i| {
            let details = SampleDetails {
                dosage: "500mg",
                form: "tablet",
                storage: "room temperature",
                lot: format!("LOT-{}", i),
            };
            // Serializing a plain struct of strings cannot fail.
            let additional_data = serde_json::to_string(&details).unwrap_or_default();

            DrugRecord::new(
                drug_name,
                format!("{}-{:03}", prefix, i),
                "PharmaCorp Ltd",
                base,
                expiry,
                format!("SN{}{}", base.timestamp_millis(), i),
            )
            .with_additional_data(additional_data)
        })
        .collect()
}

/// Drop precision below one millisecond
pub fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    value - Duration::nanoseconds(i64::from(value.timestamp_subsec_nanos() % 1_000_000))
}

/// Reference hash of a WHO-approved drug: hex Keccak-256 of `"{name}-WHO-{year}"`
pub fn who_approval_hash(drug_name: &str, approval_year: u32) -> String {
    hex::encode(crypto::keccak256(format!("{}-WHO-{}", drug_name, approval_year).as_bytes()))
}

/// Render a timestamp the way it is committed into leaves
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
