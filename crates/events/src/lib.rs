//! BiLend Events - audit journal and snapshot persistence
//!
//! Every committed ledger event is appended to hash-chained JSONL files.
//! The snapshot is a cache of current state; the journal is the audit trail.

pub mod error;
pub mod hash;
pub mod reader;
pub mod record;
pub mod snapshot;
pub mod store;

pub use error::EventError;
pub use hash::{calculate_record_hash, verify_chain, ChainError, GENESIS_HASH};
pub use reader::EventReader;
pub use record::JournalRecord;
pub use snapshot::SnapshotStore;
pub use store::EventStore;
