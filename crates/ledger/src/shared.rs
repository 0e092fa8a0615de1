//! Thread-safe ledger handle
//!
//! Every call holds the mutex for its full duration, transfers included, so
//! operations are linearizable. A call made from inside another call on the
//! same ledger (a transfer callback re-entering the pool) fails with
//! `Reentrant` instead of deadlocking.

use bilend_core::{Address, Amount};
use bilend_rate::RateModelKind;
use std::cell::RefCell;
use std::sync::{Arc, Mutex};

use crate::account::Account;
use crate::engine::Ledger;
use crate::error::LedgerError;
use crate::event::LedgerEvent;
use crate::pool::{AccrualOutcome, PoolState};
use crate::snapshot::LedgerSnapshot;
use crate::transfer::AssetTransfer;

thread_local! {
    /// Ledgers this thread is currently inside, keyed by mutex address
    static ACTIVE: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks the current thread as inside a ledger until dropped
struct EntryGuard {
    key: usize,
}

impl EntryGuard {
    fn enter(key: usize) -> Result<Self, LedgerError> {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&key) {
                return Err(LedgerError::Reentrant);
            }
            active.push(key);
            Ok(Self { key })
        })
    }
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.borrow_mut().retain(|k| *k != self.key));
    }
}

/// Cloneable, mutex-guarded ledger
pub struct SharedLedger<T> {
    inner: Arc<Mutex<Ledger<T>>>,
}

impl<T> Clone for SharedLedger<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: AssetTransfer> SharedLedger<T> {
    pub fn new(ledger: Ledger<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Run `f` with exclusive access to the ledger
    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut Ledger<T>) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let _entry = EntryGuard::enter(Arc::as_ptr(&self.inner) as usize)?;
        let mut ledger = self.inner.lock().map_err(|_| LedgerError::LockPoisoned)?;
        f(&mut ledger)
    }

    fn read<R>(&self, f: impl FnOnce(&Ledger<T>) -> R) -> Result<R, LedgerError> {
        self.with(|ledger| Ok(f(ledger)))
    }

    pub fn accrue(&self) -> Result<Option<AccrualOutcome>, LedgerError> {
        self.with(|l| l.accrue())
    }

    pub fn deposit(&self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.with(|l| l.deposit(caller, amount))
    }

    pub fn withdraw(&self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.with(|l| l.withdraw(caller, amount))
    }

    pub fn borrow(&self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.with(|l| l.borrow(caller, amount))
    }

    pub fn repay(&self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.with(|l| l.repay(caller, amount))
    }

    pub fn liquidate(
        &self,
        liquidator: &Address,
        user: &Address,
        amount: Amount,
    ) -> Result<(Amount, Amount), LedgerError> {
        self.with(|l| l.liquidate(liquidator, user, amount))
    }

    pub fn withdraw_protocol_fees(&self, caller: &Address) -> Result<Amount, LedgerError> {
        self.with(|l| l.withdraw_protocol_fees(caller))
    }

    pub fn set_rate_model(&self, caller: &Address, kind: RateModelKind) -> Result<(), LedgerError> {
        self.with(|l| l.set_rate_model(caller, kind))
    }

    pub fn pause(&self, caller: &Address) -> Result<(), LedgerError> {
        self.with(|l| l.pause(caller))
    }

    pub fn unpause(&self, caller: &Address) -> Result<(), LedgerError> {
        self.with(|l| l.unpause(caller))
    }

    pub fn account(&self, user: &Address) -> Result<Account, LedgerError> {
        self.read(|l| l.account(user))
    }

    pub fn pool(&self) -> Result<PoolState, LedgerError> {
        self.read(|l| *l.pool())
    }

    pub fn health_factor(&self, user: &Address) -> Result<u128, LedgerError> {
        self.read(|l| l.health_factor(user))
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        self.read(|l| l.snapshot())
    }

    pub fn drain_events(&self) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.with(|l| Ok(l.drain_events()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LedgerConfig;
    use crate::transfer::Vault;

    fn shared() -> SharedLedger<Vault> {
        let mut vault = Vault::new();
        vault
            .credit(&"alice".parse().unwrap(), Amount::new(1_000))
            .unwrap();
        let ledger =
            Ledger::new(LedgerConfig::default(), vault, Arc::new(ManualClock::new(0))).unwrap();
        SharedLedger::new(ledger)
    }

    #[test]
    fn test_nested_call_is_reentrant() {
        let ledger = shared();
        let inner = ledger.clone();

        let result = ledger.with(|_| inner.pool());
        assert_eq!(result, Err(LedgerError::Reentrant));

        // guard released afterwards
        assert!(ledger.pool().is_ok());
    }

    #[test]
    fn test_distinct_ledgers_do_not_conflict() {
        let a = shared();
        let b = shared();

        let result = a.with(|_| b.pool());
        assert!(result.is_ok());
    }

    #[test]
    fn test_poisoned_lock_reported() {
        let ledger = shared();
        let clone = ledger.clone();

        let _ = std::thread::spawn(move || {
            let _ = clone.with(|_| -> Result<(), LedgerError> { panic!("boom") });
        })
        .join();

        assert_eq!(ledger.pool(), Err(LedgerError::LockPoisoned));
    }
}
