//! Data models for MedChain batches

mod drug;

pub use drug::{
    batch_from_json, format_timestamp, sample_batch, timestamp, truncate_to_millis,
    who_approval_hash, DrugRecord,
};
