//! Ledger configuration with configurable risk parameters
//!
//! Every field has a default, so a config file only needs the values it
//! overrides.

use bilend_core::{Address, Bps};
use bilend_rate::{RateModel, RateModelKind, RateModelParams};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Configuration for a lending pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    // === Risk parameters ===
    /// Minimum collateral/debt ratio to open or extend a borrow (150%)
    #[serde(default = "default_collateral_ratio")]
    pub collateral_ratio_bps: Bps,

    /// Health factor at or below which a position may be liquidated (125%)
    #[serde(default = "default_liquidation_threshold")]
    pub liquidation_threshold_bps: Bps,

    /// Bonus paid to the liquidator out of the victim's collateral (5%)
    #[serde(default = "default_liquidation_penalty")]
    pub liquidation_penalty_bps: Bps,

    /// Health factor a withdrawal must leave behind (100%)
    #[serde(default = "default_min_withdraw_health")]
    pub min_withdraw_health_bps: Bps,

    // === Revenue ===
    /// Protocol cut of accrued interest (10%)
    #[serde(default = "default_protocol_fee")]
    pub protocol_fee_bps: Bps,

    // === Rate model ===
    #[serde(default)]
    pub rate_model_kind: RateModelKind,

    #[serde(default)]
    pub rate_model_params: RateModelParams,

    // === Roles ===
    /// Holder of the administrative role
    #[serde(default = "default_owner")]
    pub owner: Address,

    /// Destination of swept protocol fees
    #[serde(default = "default_fee_recipient")]
    pub fee_recipient: Address,
}

// Default value functions for serde
fn default_collateral_ratio() -> Bps {
    Bps::new(15_000)
}

fn default_liquidation_threshold() -> Bps {
    Bps::new(12_500)
}

fn default_liquidation_penalty() -> Bps {
    Bps::new(500)
}

fn default_min_withdraw_health() -> Bps {
    Bps::new(10_000)
}

fn default_protocol_fee() -> Bps {
    Bps::new(1_000)
}

fn default_owner() -> Address {
    Address::new_unchecked("OWNER")
}

fn default_fee_recipient() -> Address {
    Address::new_unchecked("TREASURY")
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            collateral_ratio_bps: default_collateral_ratio(),
            liquidation_threshold_bps: default_liquidation_threshold(),
            liquidation_penalty_bps: default_liquidation_penalty(),
            min_withdraw_health_bps: default_min_withdraw_health(),
            protocol_fee_bps: default_protocol_fee(),
            rate_model_kind: RateModelKind::default(),
            rate_model_params: RateModelParams::default(),
            owner: default_owner(),
            fee_recipient: default_fee_recipient(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Reject parameter combinations that would break the ledger invariants
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.protocol_fee_bps > Bps::ONE {
            return Err(LedgerError::InvalidConfig(format!(
                "protocol fee {} exceeds 100%",
                self.protocol_fee_bps
            )));
        }
        if self.liquidation_penalty_bps > Bps::ONE {
            return Err(LedgerError::InvalidConfig(format!(
                "liquidation penalty {} exceeds 100%",
                self.liquidation_penalty_bps
            )));
        }
        if self.collateral_ratio_bps < Bps::ONE {
            return Err(LedgerError::InvalidConfig(format!(
                "collateral ratio {} below 100%",
                self.collateral_ratio_bps
            )));
        }
        if self.liquidation_threshold_bps > self.collateral_ratio_bps {
            return Err(LedgerError::InvalidConfig(format!(
                "liquidation threshold {} above collateral ratio {}",
                self.liquidation_threshold_bps, self.collateral_ratio_bps
            )));
        }
        if self.min_withdraw_health_bps > self.collateral_ratio_bps {
            return Err(LedgerError::InvalidConfig(format!(
                "withdraw floor {} above collateral ratio {}",
                self.min_withdraw_health_bps, self.collateral_ratio_bps
            )));
        }
        Ok(())
    }

    /// Rate model built from the configured variant and parameters
    pub fn rate_model(&self) -> RateModel {
        RateModel::new(self.rate_model_kind, self.rate_model_params)
    }
}
