//! JSONL journal reader - sequential reader for audit and replay

use crate::error::EventError;
use crate::record::JournalRecord;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Sequential journal reader
pub struct EventReader {
    files: Vec<PathBuf>,
}

impl EventReader {
    /// Create a reader over every `.jsonl` file in a directory
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let file_path = entry?.path();
                if file_path.extension().is_some_and(|ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }

        // YYYY-MM-DD names sort chronologically
        files.sort();

        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Read all records from all files in order
    pub fn read_all(&self) -> Result<Vec<JournalRecord>, EventError> {
        let mut records = Vec::new();
        for file_path in &self.files {
            read_file(file_path, |record| records.push(record))?;
        }
        Ok(records)
    }

    /// Last record of the journal (chain tip)
    pub fn last_record(&self) -> Result<Option<JournalRecord>, EventError> {
        for file_path in self.files.iter().rev() {
            let mut last = None;
            read_file(file_path, |record| last = Some(record))?;
            if last.is_some() {
                return Ok(last);
            }
        }
        Ok(None)
    }

    /// Count records across all files without decoding them
    pub fn count(&self) -> Result<usize, EventError> {
        let mut count = 0;

        for file_path in &self.files {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines() {
                if !line?.trim().is_empty() {
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

fn read_file(path: &Path, mut f: impl FnMut(JournalRecord)) -> Result<(), EventError> {
    let reader = BufReader::new(File::open(path)?);

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: JournalRecord = serde_json::from_str(&line).map_err(|e| {
            EventError::InvalidFile(format!("{}:{}: {}", path.display(), index + 1, e))
        })?;
        f(record);
    }

    Ok(())
}
