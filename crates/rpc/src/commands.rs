//! CLI commands

use bilend_core::{Address, Amount, Bps};
use bilend_events::{verify_chain, EventReader};
use bilend_ledger::HEALTH_FACTOR_MAX;
use bilend_rate::RateModelKind;
use rust_decimal::Decimal;

use crate::context::AppContext;

/// Create the state file with the configured parameters
pub fn init(ctx: &mut AppContext, correlation_id: &str) -> Result<(), anyhow::Error> {
    if ctx.is_initialized() {
        anyhow::bail!(
            "Ledger already initialized (state file {})",
            ctx.state_path().display()
        );
    }

    ctx.commit(correlation_id)?;

    let config = ctx.ledger.config();
    println!(
        "✅ Ledger initialized: collateral {}, liquidation at {}, rate model {}",
        percent(config.collateral_ratio_bps),
        percent(config.liquidation_threshold_bps),
        config.rate_model_kind
    );
    Ok(())
}

/// Credit a wallet from outside the pool (faucet)
pub fn fund(
    ctx: &mut AppContext,
    user: &Address,
    amount: Amount,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    let balance = ctx.ledger.transfer_mut().credit(user, amount)?;
    ctx.commit(correlation_id)?;

    println!("✅ Funded {} with {} (wallet: {})", user, amount, balance);
    Ok(())
}

pub fn deposit(
    ctx: &mut AppContext,
    user: &Address,
    amount: Amount,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    ctx.ledger.deposit(user, amount)?;
    let records = ctx.commit(correlation_id)?;

    println!("✅ Deposited {} for {} (seq: {})", amount, user, last_seq(&records));
    Ok(())
}

pub fn withdraw(
    ctx: &mut AppContext,
    user: &Address,
    amount: Amount,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    ctx.ledger.withdraw(user, amount)?;
    let records = ctx.commit(correlation_id)?;

    println!("✅ Withdrew {} for {} (seq: {})", amount, user, last_seq(&records));
    Ok(())
}

pub fn borrow(
    ctx: &mut AppContext,
    user: &Address,
    amount: Amount,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    ctx.ledger.borrow(user, amount)?;
    let records = ctx.commit(correlation_id)?;

    println!(
        "✅ Borrowed {} for {} (health: {}, seq: {})",
        amount,
        user,
        health(ctx.ledger.health_factor(user)),
        last_seq(&records)
    );
    Ok(())
}

pub fn repay(
    ctx: &mut AppContext,
    user: &Address,
    amount: Amount,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    ctx.ledger.repay(user, amount)?;
    let records = ctx.commit(correlation_id)?;

    println!("✅ Repaid {} for {} (seq: {})", amount, user, last_seq(&records));
    Ok(())
}

pub fn liquidate(
    ctx: &mut AppContext,
    liquidator: &Address,
    user: &Address,
    amount: Amount,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    let (repaid, bonus) = ctx.ledger.liquidate(liquidator, user, amount)?;
    let records = ctx.commit(correlation_id)?;

    println!(
        "✅ {} liquidated {}: repaid {}, bonus {} (seq: {})",
        liquidator,
        user,
        repaid,
        bonus,
        last_seq(&records)
    );
    Ok(())
}

pub fn accrue(ctx: &mut AppContext, correlation_id: &str) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    match ctx.ledger.accrue()? {
        Some(outcome) => {
            ctx.commit(correlation_id)?;
            println!(
                "✅ Accrued {} over {}s at {} (protocol: {}, suppliers: {})",
                outcome.interest,
                outcome.elapsed,
                percent(outcome.borrow_rate),
                outcome.protocol_share,
                outcome.supplier_share
            );
        }
        None => println!("Nothing to accrue"),
    }
    Ok(())
}

pub fn collect_fees(
    ctx: &mut AppContext,
    caller: &Address,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    let amount = ctx.ledger.withdraw_protocol_fees(caller)?;
    ctx.commit(correlation_id)?;

    println!(
        "✅ Collected {} protocol fees to {}",
        amount,
        ctx.ledger.config().fee_recipient
    );
    Ok(())
}

pub fn set_rate_model(
    ctx: &mut AppContext,
    caller: &Address,
    kind: RateModelKind,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    ctx.ledger.set_rate_model(caller, kind)?;
    ctx.commit(correlation_id)?;

    println!(
        "✅ Rate model set to {} (borrow rate now {})",
        kind,
        percent(ctx.ledger.current_borrow_rate())
    );
    Ok(())
}

pub fn pause(ctx: &mut AppContext, caller: &Address, correlation_id: &str) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    ctx.ledger.pause(caller)?;
    ctx.commit(correlation_id)?;

    println!("⏸️  Ledger paused by {}", caller);
    Ok(())
}

pub fn unpause(ctx: &mut AppContext, caller: &Address, correlation_id: &str) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    ctx.ledger.unpause(caller)?;
    ctx.commit(correlation_id)?;

    println!("▶️  Ledger active");
    Ok(())
}

/// Show a user's position and wallet
pub fn account(ctx: &AppContext, user: &Address) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    let account = ctx.ledger.account(user);

    println!("Account {}", user);
    println!("  deposit:      {}", account.principal_deposit);
    println!("  borrow:       {}", account.principal_borrow);
    println!("  claim:        {}", ctx.ledger.claim(user)?);
    println!("  withdrawable: {}", ctx.ledger.withdrawable(user)?);
    println!("  health:       {}", health(account.health_factor()));
    println!("  liquidatable: {}", ctx.ledger.is_liquidatable(user));
    println!("  wallet:       {}", ctx.ledger.transfer().balance_of(user));
    Ok(())
}

/// Show pool aggregates and current rates
pub fn pool(ctx: &AppContext) -> Result<(), anyhow::Error> {
    ctx.ensure_initialized()?;
    let pool = ctx.ledger.pool();
    let utilization = ctx.ledger.utilization();
    let model = ctx.ledger.rate_model();
    let fee = ctx.ledger.config().protocol_fee_bps;

    println!("Pool{}", if ctx.ledger.is_paused() { " (PAUSED)" } else { "" });
    println!("  total deposits: {}", pool.total_deposits);
    println!("  total borrows:  {}", pool.total_borrows);
    println!("  free liquidity: {}", pool.free_liquidity());
    println!("  protocol fees:  {}", pool.protocol_fees);
    println!("  utilization:    {}", percent(utilization));
    println!("  rate model:     {}", model.kind());
    println!("  borrow rate:    {}", percent(model.borrow_rate(utilization)));
    println!("  supply rate:    {}", percent(model.supply_rate(utilization, fee)));
    println!("  last accrual:   {}", pool.last_accrual_time);
    println!("  accounts:       {}", ctx.ledger.accounts().count());
    Ok(())
}

/// Verify the journal hash chain and the principal aggregates
pub fn audit(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let reader = EventReader::from_directory(ctx.journal_path())?;
    let records = reader.read_all()?;

    verify_chain(&records)?;
    println!("✅ Hash chain verified: {} records", records.len());

    let mut deposits = 0u128;
    let mut borrows = 0u128;
    for (_, account) in ctx.ledger.accounts() {
        deposits = deposits
            .checked_add(account.principal_deposit.units())
            .ok_or_else(|| anyhow::anyhow!("Account deposits overflow"))?;
        borrows = borrows
            .checked_add(account.principal_borrow.units())
            .ok_or_else(|| anyhow::anyhow!("Account borrows overflow"))?;
    }

    let pool = ctx.ledger.pool();
    if deposits > pool.total_deposits.units() {
        anyhow::bail!(
            "Account deposits {} exceed total deposits {}",
            deposits,
            pool.total_deposits
        );
    }
    if borrows > pool.total_borrows.units() {
        anyhow::bail!(
            "Account borrows {} exceed total borrows {}",
            borrows,
            pool.total_borrows
        );
    }
    println!("✅ Account principals within pool aggregates");
    Ok(())
}

fn last_seq(records: &[bilend_events::JournalRecord]) -> u64 {
    records.last().map_or(0, |r| r.sequence)
}

/// 1250 bps -> "12.50%"
pub fn percent(bps: Bps) -> String {
    format!("{:.2}%", bps.as_decimal() * Decimal::ONE_HUNDRED)
}

/// Health factor as a percentage, `∞` with no debt
pub fn health(factor: u128) -> String {
    if factor == HEALTH_FACTOR_MAX {
        return "∞".to_string();
    }
    match u32::try_from(factor) {
        Ok(bps) => percent(Bps::new(bps)),
        Err(_) => format!("{} bps", factor),
    }
}
