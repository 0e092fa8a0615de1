//! BiLend CLI - Main entry point

use bilend_core::{Address, Amount};
use bilend_rate::RateModelKind;
use bilend_rpc::{commands, AppContext};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "bilend")]
#[command(about = "BiLend - single-asset collateralized lending ledger", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Ledger config (JSON), used by `init`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Correlation ID for journal records (random if omitted)
    #[arg(long, global = true)]
    correlation_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the ledger state with the configured parameters
    Init,

    /// Credit a user's wallet from outside the pool
    Fund {
        /// User ID (will be uppercased)
        user: Address,
        amount: Amount,
    },

    /// Supply the asset to the pool
    Deposit { user: Address, amount: Amount },

    /// Take supplied asset back out of the pool
    Withdraw { user: Address, amount: Amount },

    /// Borrow against the user's deposit
    Borrow { user: Address, amount: Amount },

    /// Pay back outstanding borrow
    Repay { user: Address, amount: Amount },

    /// Repay part of an unhealthy position for its collateral plus a bonus
    Liquidate {
        liquidator: Address,
        user: Address,
        amount: Amount,
    },

    /// Accrue interest up to now
    Accrue,

    /// Sweep protocol fees to the fee recipient (owner only)
    CollectFees { caller: Address },

    /// Switch the interest rate formula (owner only)
    SetRateModel {
        caller: Address,
        /// linear, kink or exponential
        kind: RateModelKind,
    },

    /// Stop all mutating operations (owner only)
    Pause { caller: Address },

    /// Resume operations (owner only)
    Unpause { caller: Address },

    /// Show a user's position
    Account { user: Address },

    /// Show pool aggregates and rates
    Pool,

    /// Verify the journal hash chain
    Audit,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut ctx = AppContext::new(&cli.data, cli.config.as_deref())?;
    let correlation_id = cli
        .correlation_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let cid = correlation_id.as_str();

    match cli.command {
        Commands::Init => commands::init(&mut ctx, cid)?,
        Commands::Fund { user, amount } => commands::fund(&mut ctx, &user, amount, cid)?,
        Commands::Deposit { user, amount } => commands::deposit(&mut ctx, &user, amount, cid)?,
        Commands::Withdraw { user, amount } => commands::withdraw(&mut ctx, &user, amount, cid)?,
        Commands::Borrow { user, amount } => commands::borrow(&mut ctx, &user, amount, cid)?,
        Commands::Repay { user, amount } => commands::repay(&mut ctx, &user, amount, cid)?,
        Commands::Liquidate {
            liquidator,
            user,
            amount,
        } => commands::liquidate(&mut ctx, &liquidator, &user, amount, cid)?,
        Commands::Accrue => commands::accrue(&mut ctx, cid)?,
        Commands::CollectFees { caller } => commands::collect_fees(&mut ctx, &caller, cid)?,
        Commands::SetRateModel { caller, kind } => {
            commands::set_rate_model(&mut ctx, &caller, kind, cid)?
        }
        Commands::Pause { caller } => commands::pause(&mut ctx, &caller, cid)?,
        Commands::Unpause { caller } => commands::unpause(&mut ctx, &caller, cid)?,
        Commands::Account { user } => commands::account(&ctx, &user)?,
        Commands::Pool => commands::pool(&ctx)?,
        Commands::Audit => commands::audit(&ctx)?,
    }

    Ok(())
}
