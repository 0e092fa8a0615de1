//! Persistable ledger state
//!
//! The transfer collaborator and the clock are not part of the snapshot;
//! they are supplied again on restore.

use bilend_core::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::account::Account;
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::engine::Ledger;
use crate::error::LedgerError;
use crate::pool::PoolState;
use crate::transfer::AssetTransfer;

/// Serializable image of a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Carries the active rate model kind
    pub config: LedgerConfig,
    pub pool: PoolState,
    pub paused: bool,
    /// Non-zero accounts only, ordered for stable output
    pub accounts: BTreeMap<Address, Account>,
}

impl<T: AssetTransfer> Ledger<T> {
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            config: self.config.clone(),
            pool: self.pool,
            paused: self.paused,
            accounts: self
                .accounts
                .iter()
                .filter(|(_, account)| !account.is_empty())
                .map(|(address, account)| (address.clone(), *account))
                .collect(),
        }
    }

    /// Rebuild a ledger from a snapshot. The event buffer starts empty.
    pub fn from_snapshot(
        snapshot: LedgerSnapshot,
        transfer: T,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LedgerError> {
        snapshot.config.validate()?;

        let accounts: HashMap<Address, Account> = snapshot
            .accounts
            .into_iter()
            .filter(|(_, account)| !account.is_empty())
            .collect();

        Ok(Self {
            rate_model: snapshot.config.rate_model(),
            config: snapshot.config,
            pool: snapshot.pool,
            accounts,
            paused: snapshot.paused,
            transfer,
            clock,
            events: Vec::new(),
        })
    }
}
