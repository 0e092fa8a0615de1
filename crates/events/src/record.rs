//! Journal record - one committed ledger event plus chain metadata

use bilend_ledger::LedgerEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::hash::calculate_record_hash;

/// A sealed, hash-linked journal line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Strictly increasing, starting at 1
    pub sequence: u64,
    /// Hash of the previous record (`GENESIS` for the first)
    pub prev_hash: String,
    pub hash: String,
    pub recorded_at: DateTime<Utc>,
    /// Ties together the records produced by one request
    pub correlation_id: String,
    pub event: LedgerEvent,
}

impl JournalRecord {
    /// Build a record and compute its hash
    pub fn seal(
        sequence: u64,
        prev_hash: impl Into<String>,
        recorded_at: DateTime<Utc>,
        correlation_id: impl Into<String>,
        event: LedgerEvent,
    ) -> Result<Self, EventError> {
        let mut record = Self {
            sequence,
            prev_hash: prev_hash.into(),
            hash: String::new(),
            recorded_at,
            correlation_id: correlation_id.into(),
            event,
        };
        record.hash = calculate_record_hash(&record)?;
        Ok(record)
    }
}
