//! Lending ledger implementation
//!
//! Every mutating operation follows the same flow:
//! pause check → authorization → stage (accrue on a copy of the pool) →
//! state checks → transfers → commit.
//! Nothing is written to `self` before commit, so any error leaves the ledger
//! exactly as it was, including the staged accrual.

use bilend_core::{mul_div_ceil, mul_div_floor, Address, Amount, Bps, BPS_SCALE};
use bilend_rate::{RateModel, RateModelKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::account::Account;
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::event::LedgerEvent;
use crate::pool::{AccrualOutcome, PoolState};
use crate::transfer::AssetTransfer;

/// Single-asset lending ledger
///
/// Operations take `&mut self`, so a `Ledger` is exclusive by construction.
/// Use [`crate::SharedLedger`] to share one across threads.
pub struct Ledger<T> {
    pub(crate) config: LedgerConfig,
    pub(crate) rate_model: RateModel,
    pub(crate) pool: PoolState,
    pub(crate) accounts: HashMap<Address, Account>,
    pub(crate) paused: bool,
    pub(crate) transfer: T,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) events: Vec<LedgerEvent>,
}

/// Pool copy with accrual already applied, not yet visible
struct Staged {
    pool: PoolState,
    accrual: Option<AccrualOutcome>,
}

impl<T: AssetTransfer> Ledger<T> {
    /// Create a new pool at the clock's current time
    pub fn new(config: LedgerConfig, transfer: T, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        config.validate()?;
        let pool = PoolState::new(clock.now());

        Ok(Self {
            rate_model: config.rate_model(),
            config,
            pool,
            accounts: HashMap::new(),
            paused: false,
            transfer,
            clock,
            events: Vec::new(),
        })
    }

    // === Views ===

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn rate_model(&self) -> &RateModel {
        &self.rate_model
    }

    pub fn pool(&self) -> &PoolState {
        &self.pool
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Account for a user (zero account if never seen)
    pub fn account(&self, user: &Address) -> Account {
        self.accounts.get(user).copied().unwrap_or_default()
    }

    /// All non-empty accounts
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    /// Direct access to the transfer collaborator (funding wallets, etc.)
    pub fn transfer_mut(&mut self) -> &mut T {
        &mut self.transfer
    }

    pub fn health_factor(&self, user: &Address) -> u128 {
        self.account(user).health_factor()
    }

    /// Whether `liquidate` would pass the eligibility gate right now
    pub fn is_liquidatable(&self, user: &Address) -> bool {
        let account = self.account(user);
        !account.principal_borrow.is_zero()
            && account.health_factor() <= u128::from(self.config.liquidation_threshold_bps.value())
    }

    pub fn utilization(&self) -> Bps {
        self.pool.utilization()
    }

    /// Borrow rate implied by the last accrued aggregates
    pub fn current_borrow_rate(&self) -> Bps {
        self.rate_model.borrow_rate(self.pool.utilization())
    }

    /// Pro-rata share of `total_deposits - total_borrows` for a user
    pub fn interest_share(&self, user: &Address) -> Result<Amount, LedgerError> {
        interest_share_in(&self.pool, &self.account(user))
    }

    /// `principal_deposit + interest_share`, the upper bound on what a supplier is owed
    pub fn claim(&self, user: &Address) -> Result<Amount, LedgerError> {
        let account = self.account(user);
        let share = interest_share_in(&self.pool, &account)?;
        add(account.principal_deposit, share, "claim")
    }

    /// Largest amount `withdraw` accepts for `user` right now.
    ///
    /// Interest is accrued to the clock's current time first, exactly as
    /// `withdraw` would do it.
    pub fn withdrawable(&self, user: &Address) -> Result<Amount, LedgerError> {
        let staged = self.stage()?;
        max_withdraw_in(&staged.pool, &self.account(user), self.config.min_withdraw_health_bps)
    }

    /// Events recorded since the last drain
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Hand recorded events to the caller (journal, indexer)
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    // === Operations ===

    /// Advance interest bookkeeping to now.
    ///
    /// Returns `None` when no time has elapsed since the last accrual.
    pub fn accrue(&mut self) -> Result<Option<AccrualOutcome>, LedgerError> {
        let result = self.ensure_active().and_then(|_| self.stage());
        let staged = rejected("accrue", None, result)?;
        let outcome = staged.accrual;
        if outcome.is_some() {
            self.commit(staged, Vec::new(), None);
        }
        Ok(outcome)
    }

    pub fn deposit(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        let result = self.try_deposit(caller, amount);
        rejected("deposit", Some(caller), result)
    }

    pub fn withdraw(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        let result = self.try_withdraw(caller, amount);
        rejected("withdraw", Some(caller), result)
    }

    pub fn borrow(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        let result = self.try_borrow(caller, amount);
        rejected("borrow", Some(caller), result)
    }

    pub fn repay(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        let result = self.try_repay(caller, amount);
        rejected("repay", Some(caller), result)
    }

    /// Repay up to `amount` of `user`'s debt in exchange for collateral plus a bonus.
    ///
    /// Returns `(repaid, bonus)`. The liquidator pays `repaid` and receives
    /// `repaid + bonus`.
    pub fn liquidate(
        &mut self,
        liquidator: &Address,
        user: &Address,
        amount: Amount,
    ) -> Result<(Amount, Amount), LedgerError> {
        let result = self.try_liquidate(liquidator, user, amount);
        rejected("liquidate", Some(liquidator), result)
    }

    /// Sweep accrued protocol fees to the fee recipient. Owner only.
    pub fn withdraw_protocol_fees(&mut self, caller: &Address) -> Result<Amount, LedgerError> {
        let result = self.try_withdraw_protocol_fees(caller);
        rejected("withdraw_protocol_fees", Some(caller), result)
    }

    /// Switch the rate formula. Owner only.
    ///
    /// Interest up to now is accrued at the old rate first.
    pub fn set_rate_model(&mut self, caller: &Address, kind: RateModelKind) -> Result<(), LedgerError> {
        let result = self.try_set_rate_model(caller, kind);
        rejected("set_rate_model", Some(caller), result)
    }

    /// Stop all mutating operations. Owner only.
    pub fn pause(&mut self, caller: &Address) -> Result<(), LedgerError> {
        let result = self.ensure_active().and_then(|_| self.ensure_owner(caller));
        rejected("pause", Some(caller), result)?;

        self.paused = true;
        self.record(LedgerEvent::Paused {
            actor: caller.clone(),
        });
        Ok(())
    }

    /// Resume operations. Owner only; a no-op on an active ledger.
    pub fn unpause(&mut self, caller: &Address) -> Result<(), LedgerError> {
        rejected("unpause", Some(caller), self.ensure_owner(caller))?;

        if self.paused {
            self.paused = false;
            self.record(LedgerEvent::Unpaused {
                actor: caller.clone(),
            });
        }
        Ok(())
    }

    // === Operation bodies ===

    fn try_deposit(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.ensure_active()?;
        require_positive(amount)?;

        let mut staged = self.stage()?;
        let mut account = self.account(caller);

        account.principal_deposit = add(account.principal_deposit, amount, "principal deposit")?;
        staged.pool.total_deposits = add(staged.pool.total_deposits, amount, "total deposits")?;

        self.transfer.transfer_in(caller, amount)?;

        self.commit(
            staged,
            vec![(caller.clone(), account)],
            Some(LedgerEvent::Deposited {
                actor: caller.clone(),
                amount,
            }),
        );
        Ok(())
    }

    fn try_withdraw(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.ensure_active()?;
        require_positive(amount)?;

        let mut staged = self.stage()?;
        let mut account = self.account(caller);

        // principal never exceeds the claim, so this cap also bounds the claim
        let remaining = account.principal_deposit.checked_sub(amount).ok_or_else(|| {
            LedgerError::InsufficientBalance {
                account: caller.clone(),
                available: account.principal_deposit,
                required: amount,
            }
        })?;

        if amount > staged.pool.free_liquidity() {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "exceeds free liquidity",
            });
        }

        let floor = self.config.min_withdraw_health_bps;
        match Account::covers(remaining, account.principal_borrow, floor) {
            Some(true) => {}
            Some(false) => {
                return Err(LedgerError::InvalidCollateralRatio {
                    collateral: remaining,
                    debt: account.principal_borrow,
                    required: floor,
                })
            }
            None => return Err(LedgerError::MathOverflow("withdraw collateral check")),
        }

        account.principal_deposit = remaining;
        staged.pool.total_deposits = sub(staged.pool.total_deposits, amount, "total deposits")?;

        self.transfer.transfer_out(caller, amount)?;

        self.commit(
            staged,
            vec![(caller.clone(), account)],
            Some(LedgerEvent::Withdrawn {
                actor: caller.clone(),
                amount,
            }),
        );
        Ok(())
    }

    fn try_borrow(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.ensure_active()?;
        require_positive(amount)?;

        let mut staged = self.stage()?;

        if amount > staged.pool.free_liquidity() {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "exceeds free liquidity",
            });
        }

        let mut account = self.account(caller);
        let debt = add(account.principal_borrow, amount, "principal borrow")?;
        let ratio = self.config.collateral_ratio_bps;

        match Account::covers(account.principal_deposit, debt, ratio) {
            Some(true) => {}
            Some(false) => {
                return Err(LedgerError::InvalidCollateralRatio {
                    collateral: account.principal_deposit,
                    debt,
                    required: ratio,
                })
            }
            None => return Err(LedgerError::MathOverflow("borrow collateral check")),
        }

        account.principal_borrow = debt;
        staged.pool.total_borrows = add(staged.pool.total_borrows, amount, "total borrows")?;

        self.transfer.transfer_out(caller, amount)?;

        self.commit(
            staged,
            vec![(caller.clone(), account)],
            Some(LedgerEvent::Borrowed {
                actor: caller.clone(),
                amount,
            }),
        );
        Ok(())
    }

    fn try_repay(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.ensure_active()?;
        require_positive(amount)?;

        let mut staged = self.stage()?;
        let mut account = self.account(caller);

        account.principal_borrow = account.principal_borrow.checked_sub(amount).ok_or_else(|| {
            LedgerError::InsufficientBalance {
                account: caller.clone(),
                available: account.principal_borrow,
                required: amount,
            }
        })?;
        staged.pool.total_borrows = sub(staged.pool.total_borrows, amount, "total borrows")?;

        self.transfer.transfer_in(caller, amount)?;

        self.commit(
            staged,
            vec![(caller.clone(), account)],
            Some(LedgerEvent::Repaid {
                actor: caller.clone(),
                amount,
            }),
        );
        Ok(())
    }

    fn try_liquidate(
        &mut self,
        liquidator: &Address,
        user: &Address,
        amount: Amount,
    ) -> Result<(Amount, Amount), LedgerError> {
        self.ensure_active()?;
        require_positive(amount)?;
        if liquidator == user {
            return Err(LedgerError::SelfLiquidation(liquidator.clone()));
        }

        let mut staged = self.stage()?;
        let mut victim = self.account(user);

        let health_factor = victim.health_factor();
        let threshold = u128::from(self.config.liquidation_threshold_bps.value());
        if victim.principal_borrow.is_zero() || health_factor > threshold {
            return Err(LedgerError::PositionHealthy {
                user: user.clone(),
                health_factor,
            });
        }

        let repaid = amount.min(victim.principal_borrow);
        let bonus = self
            .config
            .liquidation_penalty_bps
            .apply(repaid)
            .ok_or(LedgerError::MathOverflow("liquidation bonus"))?;
        let seized = add(repaid, bonus, "liquidation seizure")?;

        // fail closed: no partial seizure when collateral is short
        victim.principal_deposit = victim.principal_deposit.checked_sub(seized).ok_or_else(|| {
            LedgerError::InsufficientCollateral {
                user: user.clone(),
                available: victim.principal_deposit,
                required: seized,
            }
        })?;
        victim.principal_borrow = sub(victim.principal_borrow, repaid, "principal borrow")?;
        staged.pool.total_deposits = sub(staged.pool.total_deposits, seized, "total deposits")?;
        staged.pool.total_borrows = sub(staged.pool.total_borrows, repaid, "total borrows")?;

        self.transfer.transfer_in(liquidator, repaid)?;
        if let Err(payout) = self.transfer.transfer_out(liquidator, seized) {
            if let Err(refund) = self.transfer.transfer_out(liquidator, repaid) {
                error!(
                    liquidator = %liquidator,
                    amount = %repaid,
                    error = %refund,
                    "Failed to refund liquidator after aborted liquidation"
                );
                return Err(LedgerError::RefundFailed {
                    liquidator: liquidator.clone(),
                    amount: repaid,
                    payout,
                    refund,
                });
            }
            return Err(payout.into());
        }

        self.commit(
            staged,
            vec![(user.clone(), victim)],
            Some(LedgerEvent::Liquidated {
                liquidator: liquidator.clone(),
                borrower: user.clone(),
                amount: repaid,
                bonus,
            }),
        );
        Ok((repaid, bonus))
    }

    fn try_withdraw_protocol_fees(&mut self, caller: &Address) -> Result<Amount, LedgerError> {
        self.ensure_active()?;
        self.ensure_owner(caller)?;

        let mut staged = self.stage()?;
        let fees = staged.pool.protocol_fees;
        if fees.is_zero() {
            return Err(LedgerError::InvalidAmount {
                amount: fees,
                reason: "no protocol fees to withdraw",
            });
        }
        staged.pool.protocol_fees = Amount::ZERO;

        let recipient = self.config.fee_recipient.clone();
        self.transfer.transfer_out(&recipient, fees)?;

        self.commit(
            staged,
            Vec::new(),
            Some(LedgerEvent::ProtocolFeesWithdrawn {
                recipient,
                amount: fees,
            }),
        );
        Ok(fees)
    }

    fn try_set_rate_model(&mut self, caller: &Address, kind: RateModelKind) -> Result<(), LedgerError> {
        self.ensure_active()?;
        self.ensure_owner(caller)?;

        let staged = self.stage()?;
        self.commit(
            staged,
            Vec::new(),
            Some(LedgerEvent::RateModelChanged {
                actor: caller.clone(),
                kind,
            }),
        );
        self.rate_model.set_kind(kind);
        self.config.rate_model_kind = kind;
        Ok(())
    }

    // === Internals ===

    fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.paused {
            Err(LedgerError::Paused)
        } else {
            Ok(())
        }
    }

    fn ensure_owner(&self, caller: &Address) -> Result<(), LedgerError> {
        if *caller == self.config.owner {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(caller.clone()))
        }
    }

    /// Accrue on a copy of the pool
    fn stage(&self) -> Result<Staged, LedgerError> {
        let mut pool = self.pool;
        let accrual = pool.accrue(
            self.clock.now(),
            &self.rate_model,
            self.config.protocol_fee_bps,
        )?;
        Ok(Staged { pool, accrual })
    }

    /// Make staged state visible and record events. Infallible.
    fn commit(&mut self, staged: Staged, changes: Vec<(Address, Account)>, event: Option<LedgerEvent>) {
        self.pool = staged.pool;

        for (address, account) in changes {
            if account.is_empty() {
                self.accounts.remove(&address);
            } else {
                self.accounts.insert(address, account);
            }
        }

        if let Some(outcome) = staged.accrual {
            self.events.push(LedgerEvent::accrued(&outcome));
        }
        if let Some(event) = event {
            self.record(event);
        }
    }

    fn record(&mut self, event: LedgerEvent) {
        info!(
            event = event.name(),
            total_deposits = %self.pool.total_deposits,
            total_borrows = %self.pool.total_borrows,
            protocol_fees = %self.pool.protocol_fees,
            "Ledger operation committed"
        );
        self.events.push(event);
    }
}

fn rejected<R>(op: &'static str, caller: Option<&Address>, result: Result<R, LedgerError>) -> Result<R, LedgerError> {
    if let Err(ref e) = result {
        warn!(op, caller = ?caller.map(Address::as_str), error = %e, "Ledger operation rejected");
    }
    result
}

fn require_positive(amount: Amount) -> Result<(), LedgerError> {
    if amount.is_zero() {
        Err(LedgerError::InvalidAmount {
            amount,
            reason: "amount must be positive",
        })
    } else {
        Ok(())
    }
}

fn add(a: Amount, b: Amount, what: &'static str) -> Result<Amount, LedgerError> {
    a.checked_add(b).ok_or(LedgerError::MathOverflow(what))
}

fn sub(a: Amount, b: Amount, what: &'static str) -> Result<Amount, LedgerError> {
    a.checked_sub(b).ok_or(LedgerError::MathOverflow(what))
}

fn interest_share_in(pool: &PoolState, account: &Account) -> Result<Amount, LedgerError> {
    if pool.total_deposits.is_zero() {
        return Ok(Amount::ZERO);
    }
    mul_div_floor(
        account.principal_deposit.units(),
        pool.free_liquidity().units(),
        pool.total_deposits.units(),
    )
    .map(Amount::new)
    .ok_or(LedgerError::MathOverflow("interest share"))
}

/// min(principal, free liquidity, principal above the health floor)
fn max_withdraw_in(pool: &PoolState, account: &Account, floor: Bps) -> Result<Amount, LedgerError> {
    let locked = mul_div_ceil(account.principal_borrow.units(), floor.as_u128(), BPS_SCALE)
        .ok_or(LedgerError::MathOverflow("withdraw collateral floor"))?;
    let unlocked = account.principal_deposit.units().saturating_sub(locked);

    Ok(account
        .principal_deposit
        .min(pool.free_liquidity())
        .min(Amount::new(unlocked)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::TransferError;
    use crate::transfer::Vault;

    const START: u64 = 1_700_000_000;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn setup() -> (Ledger<Vault>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let mut vault = Vault::new();
        for user in ["ALICE", "BOB", "CAROL"] {
            vault.credit(&addr(user), Amount::new(1_000_000)).unwrap();
        }
        let ledger = Ledger::new(LedgerConfig::default(), vault, clock.clone()).unwrap();
        (ledger, clock)
    }

    #[test]
    fn test_new_pool_is_empty() {
        let (ledger, _) = setup();
        assert_eq!(*ledger.pool(), PoolState::new(START));
        assert!(!ledger.is_paused());
        assert_eq!(ledger.accounts().count(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = LedgerConfig {
            protocol_fee_bps: Bps::new(20_000),
            ..LedgerConfig::default()
        };
        let result = Ledger::new(config, Vault::new(), Arc::new(ManualClock::new(0)));
        assert!(matches!(result, Err(LedgerError::InvalidConfig(_))));
    }

    #[test]
    fn test_deposit_updates_account_and_pool() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");

        ledger.deposit(&alice, Amount::new(500)).unwrap();

        assert_eq!(ledger.account(&alice).principal_deposit, Amount::new(500));
        assert_eq!(ledger.pool().total_deposits, Amount::new(500));
        assert_eq!(ledger.transfer().pool_balance(), Amount::new(500));
        assert_eq!(
            ledger.drain_events(),
            vec![LedgerEvent::Deposited {
                actor: alice,
                amount: Amount::new(500)
            }]
        );
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");

        for result in [
            ledger.deposit(&alice, Amount::ZERO),
            ledger.withdraw(&alice, Amount::ZERO),
            ledger.borrow(&alice, Amount::ZERO),
            ledger.repay(&alice, Amount::ZERO),
        ] {
            assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
        }
        assert!(matches!(
            ledger.liquidate(&addr("bob"), &alice, Amount::ZERO),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_deposit_transfer_failure_changes_nothing() {
        let (mut ledger, _) = setup();
        let dave = addr("dave"); // no wallet funds

        let result = ledger.deposit(&dave, Amount::new(10));

        assert!(matches!(
            result,
            Err(LedgerError::Transfer(TransferError::InsufficientFunds { .. }))
        ));
        assert!(ledger.account(&dave).is_empty());
        assert_eq!(ledger.pool().total_deposits, Amount::ZERO);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_borrow_at_exactly_150_percent_succeeds() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();

        ledger.borrow(&alice, Amount::new(1_000)).unwrap();

        assert_eq!(ledger.account(&alice).principal_borrow, Amount::new(1_000));
        assert_eq!(ledger.pool().total_borrows, Amount::new(1_000));
        assert_eq!(ledger.health_factor(&alice), 15_000);
    }

    #[test]
    fn test_borrow_just_above_150_percent_fails() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();

        let result = ledger.borrow(&alice, Amount::new(1_001));
        assert!(matches!(result, Err(LedgerError::InvalidCollateralRatio { .. })));
        assert_eq!(ledger.account(&alice).principal_borrow, Amount::ZERO);
    }

    #[test]
    fn test_borrow_counts_existing_debt() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(3_000)).unwrap();
        ledger.borrow(&alice, Amount::new(1_500)).unwrap();

        assert!(matches!(
            ledger.borrow(&alice, Amount::new(501)),
            Err(LedgerError::InvalidCollateralRatio { .. })
        ));
        ledger.borrow(&alice, Amount::new(500)).unwrap();
    }

    #[test]
    fn test_borrow_beyond_liquidity_fails() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_000)).unwrap();
        ledger.borrow(&alice, Amount::new(600)).unwrap();

        // bob has plenty of collateral but the pool cannot cover it
        let bob = addr("bob");
        ledger.deposit(&bob, Amount::new(10_000)).unwrap();
        let free = ledger.pool().free_liquidity();

        let result = ledger.borrow(&bob, Amount::new(free.units() + 1));
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_repay_more_than_owed_fails() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();
        ledger.borrow(&alice, Amount::new(100)).unwrap();

        assert!(matches!(
            ledger.repay(&alice, Amount::new(101)),
            Err(LedgerError::InsufficientBalance { .. })
        ));

        ledger.repay(&alice, Amount::new(100)).unwrap();
        assert_eq!(ledger.account(&alice).principal_borrow, Amount::ZERO);
        assert_eq!(ledger.pool().total_borrows, Amount::ZERO);
        assert_eq!(ledger.health_factor(&alice), crate::HEALTH_FACTOR_MAX);
    }

    #[test]
    fn test_withdraw_more_than_principal_fails() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_000)).unwrap();

        let result = ledger.withdraw(&alice, Amount::new(1_001));
        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(ledger.account(&alice).principal_deposit, Amount::new(1_000));
    }

    #[test]
    fn test_withdraw_everything_removes_account() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_000)).unwrap();

        ledger.withdraw(&alice, Amount::new(1_000)).unwrap();

        assert!(ledger.account(&alice).is_empty());
        assert_eq!(ledger.accounts().count(), 0);
        assert_eq!(ledger.transfer().balance_of(&alice), Amount::new(1_000_000));
    }

    #[test]
    fn test_withdraw_cannot_leave_debt_uncovered() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&addr("bob"), Amount::new(10_000)).unwrap();
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();
        ledger.borrow(&alice, Amount::new(1_000)).unwrap();

        // 999 left would not cover 1000 of debt
        let result = ledger.withdraw(&alice, Amount::new(501));
        assert!(matches!(result, Err(LedgerError::InvalidCollateralRatio { .. })));

        // down to exactly 100% is allowed
        ledger.withdraw(&alice, Amount::new(500)).unwrap();
        assert_eq!(ledger.health_factor(&alice), 10_000);
    }

    #[test]
    fn test_withdraw_limited_by_free_liquidity() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        let bob = addr("bob");
        ledger.deposit(&alice, Amount::new(1_000)).unwrap();
        ledger.deposit(&bob, Amount::new(3_000)).unwrap();
        ledger.borrow(&bob, Amount::new(2_000)).unwrap();

        // 2000 free in the pool, alice can take her 1000
        ledger.withdraw(&alice, Amount::new(1_000)).unwrap();

        // bob's remaining collateral covers debt, but only 1000 is free
        let result = ledger.withdraw(&bob, Amount::new(1_001));
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_interest_share_is_pro_rata_of_free_liquidity() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        let bob = addr("bob");
        ledger.deposit(&alice, Amount::new(1_000)).unwrap();
        ledger.deposit(&bob, Amount::new(3_000)).unwrap();
        ledger.borrow(&bob, Amount::new(2_000)).unwrap();

        // free = 2000; alice owns 1/4 of deposits
        assert_eq!(ledger.interest_share(&alice).unwrap(), Amount::new(500));
        assert_eq!(ledger.claim(&alice).unwrap(), Amount::new(1_500));
        assert_eq!(ledger.interest_share(&addr("nobody")).unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_withdrawable_is_accepted_by_withdraw() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        let bob = addr("bob");
        ledger.deposit(&alice, Amount::new(1_000)).unwrap();
        ledger.deposit(&bob, Amount::new(3_000)).unwrap();
        ledger.borrow(&bob, Amount::new(2_000)).unwrap();

        // capped by principal, not by the 1500 claim
        let available = ledger.withdrawable(&alice).unwrap();
        assert_eq!(available, Amount::new(1_000));
        ledger.withdraw(&alice, available).unwrap();

        // bob: 1000 free in the pool, 2000 of his deposit locked by debt
        let available = ledger.withdrawable(&bob).unwrap();
        assert_eq!(available, Amount::new(1_000));
        assert!(ledger.withdraw(&bob, Amount::new(1_001)).is_err());
        ledger.withdraw(&bob, available).unwrap();

        assert_eq!(ledger.withdrawable(&bob).unwrap(), Amount::ZERO);
        assert_eq!(ledger.withdrawable(&addr("nobody")).unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_withdrawable_rounds_locked_collateral_up() {
        let clock = Arc::new(ManualClock::new(START));
        let mut vault = Vault::new();
        for user in ["ALICE", "BOB"] {
            vault.credit(&addr(user), Amount::new(1_000_000)).unwrap();
        }
        let config = LedgerConfig {
            min_withdraw_health_bps: Bps::new(12_345),
            ..LedgerConfig::default()
        };
        let mut ledger = Ledger::new(config, vault, clock).unwrap();
        let alice = addr("alice");
        ledger.deposit(&addr("bob"), Amount::new(10_000)).unwrap();
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();
        ledger.borrow(&alice, Amount::new(999)).unwrap();

        // 999 * 123.45% = 1233.27, so 1234 stays locked
        assert_eq!(ledger.withdrawable(&alice).unwrap(), Amount::new(266));
        assert!(matches!(
            ledger.withdraw(&alice, Amount::new(267)),
            Err(LedgerError::InvalidCollateralRatio { .. })
        ));
        ledger.withdraw(&alice, Amount::new(266)).unwrap();
        assert_eq!(ledger.account(&alice).principal_deposit, Amount::new(1_234));
    }

    #[test]
    fn test_accrue_is_noop_without_elapsed_time() {
        let (mut ledger, _) = setup();
        ledger.deposit(&addr("alice"), Amount::new(1_000)).unwrap();
        ledger.drain_events();
        let before = *ledger.pool();

        assert_eq!(ledger.accrue().unwrap(), None);
        assert_eq!(ledger.accrue().unwrap(), None);

        assert_eq!(*ledger.pool(), before);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_operations_accrue_first() {
        let (mut ledger, clock) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(100_000)).unwrap();
        ledger.borrow(&alice, Amount::new(50_000)).unwrap();
        ledger.drain_events();

        clock.advance(365 * 86_400);
        ledger.repay(&alice, Amount::new(1_000)).unwrap();

        // 6000 of interest accrued before the repayment was applied
        assert_eq!(ledger.pool().total_borrows, Amount::new(55_000));
        assert_eq!(ledger.pool().total_deposits, Amount::new(105_400));
        assert_eq!(ledger.pool().protocol_fees, Amount::new(600));

        let events = ledger.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], LedgerEvent::InterestAccrued { .. }));
        assert!(matches!(events[1], LedgerEvent::Repaid { .. }));
    }

    #[test]
    fn test_failed_operation_discards_staged_accrual() {
        let (mut ledger, clock) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(100_000)).unwrap();
        ledger.borrow(&alice, Amount::new(50_000)).unwrap();
        ledger.drain_events();
        let before = *ledger.pool();

        clock.advance(86_400);
        let result = ledger.repay(&alice, Amount::new(50_001));

        assert!(result.is_err());
        assert_eq!(*ledger.pool(), before);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_liquidation_on_healthy_position_fails() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();
        ledger.borrow(&alice, Amount::new(1_000)).unwrap();

        let result = ledger.liquidate(&addr("bob"), &alice, Amount::new(100));
        assert!(matches!(
            result,
            Err(LedgerError::PositionHealthy { health_factor: 15_000, .. })
        ));
    }

    #[test]
    fn test_liquidation_without_debt_fails() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();

        assert!(matches!(
            ledger.liquidate(&addr("bob"), &alice, Amount::new(100)),
            Err(LedgerError::PositionHealthy { .. })
        ));
    }

    #[test]
    fn test_self_liquidation_rejected() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();
        ledger.borrow(&alice, Amount::new(1_000)).unwrap();
        ledger.withdraw(&alice, Amount::new(300)).unwrap();

        assert!(matches!(
            ledger.liquidate(&alice, &alice, Amount::new(100)),
            Err(LedgerError::SelfLiquidation(_))
        ));
    }

    #[test]
    fn test_liquidation_at_exactly_125_percent() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        let bob = addr("bob");
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();
        ledger.borrow(&alice, Amount::new(1_000)).unwrap();
        ledger.withdraw(&alice, Amount::new(250)).unwrap();
        assert_eq!(ledger.health_factor(&alice), 12_500);
        assert!(ledger.is_liquidatable(&alice));

        let bob_before = ledger.transfer().balance_of(&bob);
        let (repaid, bonus) = ledger.liquidate(&bob, &alice, Amount::new(400)).unwrap();

        assert_eq!(repaid, Amount::new(400));
        assert_eq!(bonus, Amount::new(20));

        let victim = ledger.account(&alice);
        assert_eq!(victim.principal_deposit, Amount::new(1_250 - 420));
        assert_eq!(victim.principal_borrow, Amount::new(600));
        assert_eq!(ledger.pool().total_deposits, Amount::new(830));
        assert_eq!(ledger.pool().total_borrows, Amount::new(600));

        // liquidator paid 400 and received 420
        assert_eq!(
            ledger.transfer().balance_of(&bob),
            bob_before.checked_add(Amount::new(20)).unwrap()
        );
    }

    #[test]
    fn test_liquidation_just_above_threshold_fails() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();
        ledger.borrow(&alice, Amount::new(1_000)).unwrap();
        ledger.withdraw(&alice, Amount::new(249)).unwrap();
        assert_eq!(ledger.health_factor(&alice), 12_510);

        assert!(matches!(
            ledger.liquidate(&addr("bob"), &alice, Amount::new(100)),
            Err(LedgerError::PositionHealthy { .. })
        ));
    }

    #[test]
    fn test_liquidation_clamps_to_outstanding_debt() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        let bob = addr("bob");
        ledger.deposit(&bob, Amount::new(10_000)).unwrap();
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();
        ledger.borrow(&alice, Amount::new(1_000)).unwrap();
        ledger.withdraw(&alice, Amount::new(300)).unwrap();

        let (repaid, bonus) = ledger
            .liquidate(&bob, &alice, Amount::new(5_000))
            .unwrap();

        assert_eq!(repaid, Amount::new(1_000));
        assert_eq!(bonus, Amount::new(50));
        assert_eq!(ledger.account(&alice).principal_borrow, Amount::ZERO);
        assert_eq!(ledger.account(&alice).principal_deposit, Amount::new(150));
    }

    #[test]
    fn test_liquidation_with_short_collateral_fails_atomically() {
        let (mut ledger, _) = setup();
        let alice = addr("alice");
        let bob = addr("bob");
        ledger.deposit(&bob, Amount::new(10_000)).unwrap();
        ledger.deposit(&alice, Amount::new(1_500)).unwrap();
        ledger.borrow(&alice, Amount::new(1_000)).unwrap();
        // down to 100%: seizing 1000 + 50 bonus needs more than 1000
        ledger.withdraw(&alice, Amount::new(500)).unwrap();
        ledger.drain_events();

        let pool_before = *ledger.pool();
        let vault_before = ledger.transfer().clone();

        let result = ledger.liquidate(&bob, &alice, Amount::new(1_000));

        assert!(matches!(result, Err(LedgerError::InsufficientCollateral { .. })));
        assert_eq!(*ledger.pool(), pool_before);
        assert_eq!(*ledger.transfer(), vault_before);
        assert_eq!(
            ledger.account(&alice),
            Account::new(Amount::new(1_000), Amount::new(1_000))
        );
        assert!(ledger.events().is_empty());

        // a smaller slice still works
        ledger.liquidate(&bob, &alice, Amount::new(500)).unwrap();
    }

    #[test]
    fn test_protocol_fees_owner_only() {
        let (mut ledger, clock) = setup();
        let alice = addr("alice");
        ledger.deposit(&alice, Amount::new(100_000)).unwrap();
        ledger.borrow(&alice, Amount::new(50_000)).unwrap();
        clock.advance(365 * 86_400);

        assert!(matches!(
            ledger.withdraw_protocol_fees(&alice),
            Err(LedgerError::Unauthorized(_))
        ));

        let owner = ledger.config().owner.clone();
        let treasury = ledger.config().fee_recipient.clone();
        let swept = ledger.withdraw_protocol_fees(&owner).unwrap();

        assert_eq!(swept, Amount::new(600));
        assert_eq!(ledger.pool().protocol_fees, Amount::ZERO);
        assert_eq!(ledger.transfer().balance_of(&treasury), Amount::new(600));

        // nothing left to sweep
        assert!(matches!(
            ledger.withdraw_protocol_fees(&owner),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_set_rate_model_accrues_at_old_rate() {
        let (mut ledger, clock) = setup();
        let alice = addr("alice");
        let owner = ledger.config().owner.clone();
        ledger.deposit(&alice, Amount::new(100_000)).unwrap();
        ledger.borrow(&alice, Amount::new(50_000)).unwrap();

        clock.advance(365 * 86_400);
        ledger.set_rate_model(&owner, RateModelKind::Exponential).unwrap();

        // first year at linear 12%
        assert_eq!(ledger.pool().total_borrows, Amount::new(56_000));
        assert_eq!(ledger.rate_model().kind(), RateModelKind::Exponential);
        assert_eq!(ledger.config().rate_model_kind, RateModelKind::Exponential);

        assert!(matches!(
            ledger.set_rate_model(&alice, RateModelKind::Kink),
            Err(LedgerError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_pause_blocks_mutations_but_not_views() {
        let (mut ledger, clock) = setup();
        let alice = addr("alice");
        let owner = ledger.config().owner.clone();
        ledger.deposit(&alice, Amount::new(1_000)).unwrap();

        assert!(matches!(ledger.pause(&alice), Err(LedgerError::Unauthorized(_))));
        ledger.pause(&owner).unwrap();
        clock.advance(100);

        assert_eq!(ledger.deposit(&alice, Amount::new(1)), Err(LedgerError::Paused));
        assert_eq!(ledger.withdraw(&alice, Amount::new(1)), Err(LedgerError::Paused));
        assert_eq!(ledger.borrow(&alice, Amount::new(1)), Err(LedgerError::Paused));
        assert_eq!(ledger.accrue(), Err(LedgerError::Paused));
        assert_eq!(ledger.pause(&owner), Err(LedgerError::Paused));
        assert_eq!(ledger.account(&alice).principal_deposit, Amount::new(1_000));

        ledger.unpause(&owner).unwrap();
        ledger.deposit(&alice, Amount::new(1)).unwrap();
    }

    #[test]
    fn test_unpause_on_active_ledger_is_noop() {
        let (mut ledger, _) = setup();
        let owner = ledger.config().owner.clone();

        ledger.unpause(&owner).unwrap();
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_conservation_without_accrual() {
        let (mut ledger, _) = setup();
        let users = [addr("alice"), addr("bob"), addr("carol")];

        ledger.deposit(&users[0], Amount::new(10_000)).unwrap();
        ledger.deposit(&users[1], Amount::new(7_000)).unwrap();
        ledger.borrow(&users[0], Amount::new(3_000)).unwrap();
        ledger.deposit(&users[2], Amount::new(2_500)).unwrap();
        ledger.borrow(&users[2], Amount::new(1_000)).unwrap();
        ledger.withdraw(&users[1], Amount::new(4_000)).unwrap();
        ledger.repay(&users[0], Amount::new(1_234)).unwrap();
        let _ = ledger.borrow(&users[1], Amount::new(5_000)); // rejected
        ledger.withdraw(&users[0], Amount::new(2_000)).unwrap();

        let deposits: u128 = users
            .iter()
            .map(|u| ledger.account(u).principal_deposit.units())
            .sum();
        let borrows: u128 = users
            .iter()
            .map(|u| ledger.account(u).principal_borrow.units())
            .sum();

        assert_eq!(deposits, ledger.pool().total_deposits.units());
        assert_eq!(borrows, ledger.pool().total_borrows.units());
    }
}
