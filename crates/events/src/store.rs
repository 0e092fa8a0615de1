//! JSONL journal - append-only, hash-chained writer

use crate::error::EventError;
use crate::hash::GENESIS_HASH;
use crate::reader::EventReader;
use crate::record::JournalRecord;
use bilend_ledger::LedgerEvent;
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only journal with one file per UTC day
pub struct EventStore {
    base_path: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
    last_sequence: u64,
    last_hash: String,
}

impl EventStore {
    /// Open the journal at `base_path`, continuing an existing chain if present
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, EventError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let tip = EventReader::from_directory(&base_path)?.last_record()?;
        let (last_sequence, last_hash) = match tip {
            Some(record) => (record.sequence, record.hash),
            None => (0, GENESIS_HASH.to_string()),
        };

        Ok(Self {
            base_path,
            current_file: None,
            current_date: None,
            last_sequence,
            last_hash,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Sequence of the last appended record (0 when empty)
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    /// Seal and append one event
    pub fn append(
        &mut self,
        correlation_id: &str,
        event: LedgerEvent,
    ) -> Result<JournalRecord, EventError> {
        self.append_at(Utc::now(), correlation_id, event)
    }

    /// Seal and append events in order under one correlation id
    pub fn append_all(
        &mut self,
        correlation_id: &str,
        events: impl IntoIterator<Item = LedgerEvent>,
    ) -> Result<Vec<JournalRecord>, EventError> {
        events
            .into_iter()
            .map(|event| self.append(correlation_id, event))
            .collect()
    }

    /// Append with an explicit timestamp (selects the daily file)
    pub fn append_at(
        &mut self,
        recorded_at: DateTime<Utc>,
        correlation_id: &str,
        event: LedgerEvent,
    ) -> Result<JournalRecord, EventError> {
        let record = JournalRecord::seal(
            self.last_sequence + 1,
            self.last_hash.clone(),
            recorded_at,
            correlation_id,
            event,
        )?;

        let date = recorded_at.format("%Y-%m-%d").to_string();
        if self.current_date.as_ref() != Some(&date) {
            self.rotate_file(&date)?;
        }

        if let Some(ref mut writer) = self.current_file {
            let json = serde_json::to_string(&record)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        self.last_sequence = record.sequence;
        self.last_hash = record.hash.clone();
        debug!(sequence = record.sequence, event = record.event.name(), "Journal record appended");

        Ok(record)
    }

    fn rotate_file(&mut self, date: &str) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }

        let file_path = self.base_path.join(format!("{}.jsonl", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(BufWriter::new(file));
        self.current_date = Some(date.to_string());

        Ok(())
    }

    /// List all JSONL files in the journal
    pub fn list_files(&self) -> Result<Vec<PathBuf>, EventError> {
        Ok(EventReader::from_directory(&self.base_path)?.files().to_vec())
    }

    /// Flush and close the current file
    pub fn close(&mut self) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;
        self.current_date = None;
        Ok(())
    }
}

impl Drop for EventStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
