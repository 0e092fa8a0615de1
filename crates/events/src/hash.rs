//! Hash chain over journal records

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::record::JournalRecord;

/// `prev_hash` of the first record
pub const GENESIS_HASH: &str = "GENESIS";

/// SHA-256 (hex) over every field except `hash`
pub fn calculate_record_hash(record: &JournalRecord) -> Result<String, serde_json::Error> {
    let event = serde_json::to_string(&record.event)?;

    let mut hasher = Sha256::new();
    hasher.update(record.sequence.to_le_bytes());
    hasher.update(record.prev_hash.as_bytes());
    hasher.update(record.recorded_at.to_rfc3339().as_bytes());
    hasher.update(record.correlation_id.as_bytes());
    hasher.update(event.as_bytes());

    Ok(hex::encode(hasher.finalize()))
}

/// Verify links, hashes and sequence numbers of a full journal
pub fn verify_chain(records: &[JournalRecord]) -> Result<(), ChainError> {
    let mut prev_hash = GENESIS_HASH.to_string();

    for (i, record) in records.iter().enumerate() {
        if i > 0 && record.sequence != records[i - 1].sequence + 1 {
            return Err(ChainError::InvalidSequence {
                expected: records[i - 1].sequence + 1,
                actual: record.sequence,
            });
        }

        if record.prev_hash != prev_hash {
            return Err(ChainError::BrokenLink {
                sequence: record.sequence,
                expected: prev_hash,
                actual: record.prev_hash.clone(),
            });
        }

        let calculated =
            calculate_record_hash(record).map_err(|e| ChainError::Unhashable {
                sequence: record.sequence,
                reason: e.to_string(),
            })?;
        if record.hash != calculated {
            return Err(ChainError::InvalidHash {
                sequence: record.sequence,
                expected: calculated,
                actual: record.hash.clone(),
            });
        }

        prev_hash = record.hash.clone();
    }

    Ok(())
}

/// Errors in hash chain verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Broken link at seq {sequence}: expected prev_hash '{expected}', got '{actual}'")]
    BrokenLink {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid hash at seq {sequence}: expected '{expected}', got '{actual}'")]
    InvalidHash {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid sequence: expected {expected}, got {actual}")]
    InvalidSequence { expected: u64, actual: u64 },

    #[error("Cannot hash record {sequence}: {reason}")]
    Unhashable { sequence: u64, reason: String },
}
