//! Application context - wires everything together
//!
//! One CLI invocation = load state → run one ledger operation → journal the
//! drained events → save state.

use bilend_events::{EventError, EventStore, JournalRecord, SnapshotStore};
use bilend_ledger::{Clock, Ledger, LedgerConfig, LedgerError, LedgerSnapshot, SystemClock, Vault};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything persisted between invocations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub ledger: LedgerSnapshot,
    pub vault: Vault,
}

/// Application context - wires together ledger, journal and state file
pub struct AppContext {
    pub ledger: Ledger<Vault>,
    pub journal: EventStore,
    state: SnapshotStore,
    journal_path: PathBuf,
    initialized: bool,
}

impl AppContext {
    /// Open the data directory using the wall clock
    pub fn new(data_path: impl AsRef<Path>, config_path: Option<&Path>) -> Result<Self, anyhow::Error> {
        Self::with_clock(data_path, config_path, Arc::new(SystemClock))
    }

    /// Open the data directory with an explicit clock.
    ///
    /// An existing state file wins over `config_path`; the config only
    /// shapes a ledger that has not been initialized yet.
    pub fn with_clock(
        data_path: impl AsRef<Path>,
        config_path: Option<&Path>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        let journal_path = data_path.join("journal");
        std::fs::create_dir_all(&journal_path)?;

        let journal = EventStore::new(&journal_path)?;
        let state = SnapshotStore::new(data_path.join("state.json"));

        let (ledger, initialized) = match state.load::<AppState>()? {
            Some(saved) => {
                if config_path.is_some() {
                    warn!("Ledger already initialized, ignoring --config");
                }
                (Ledger::from_snapshot(saved.ledger, saved.vault, clock)?, true)
            }
            None => {
                let config = match config_path {
                    Some(path) => LedgerConfig::from_file(path)?,
                    None => LedgerConfig::default(),
                };
                (Ledger::new(config, Vault::new(), clock)?, false)
            }
        };

        Ok(Self {
            ledger,
            journal,
            state,
            journal_path,
            initialized,
        })
    }

    /// Journal drained ledger events, then persist state.
    pub fn commit(&mut self, correlation_id: &str) -> Result<Vec<JournalRecord>, CommitError> {
        let events = self.ledger.drain_events();
        let records = self.journal.append_all(correlation_id, events)?;

        let state = AppState {
            ledger: self.ledger.snapshot(),
            vault: self.ledger.transfer().clone(),
        };
        self.state.save(&state)?;
        self.initialized = true;

        if let Some(last) = records.last() {
            info!(
                correlation_id,
                records = records.len(),
                last_sequence = last.sequence,
                "Committed"
            );
        }
        Ok(records)
    }

    /// Fail unless `init` has run
    pub fn ensure_initialized(&self) -> Result<(), CommitError> {
        if self.initialized {
            Ok(())
        } else {
            Err(CommitError::NotInitialized)
        }
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    pub fn state_path(&self) -> &Path {
        self.state.path()
    }

    /// Check if the state file has been written
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn last_sequence(&self) -> u64 {
        self.journal.last_sequence()
    }
}

/// Errors during commit
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Event store error: {0}")]
    Event(#[from] EventError),

    #[error("Ledger not initialized, run `bilend init` first")]
    NotInitialized,
}
