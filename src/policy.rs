//! Shared risk scoring policy.
//!
//! Both the decoder's quick risk label and the assessment engine's factor
//! breakdown read their tiers and thresholds from one `RiskPolicy`, so the two
//! labels are computed from the same tables.
//!
//! Level mapping (score → level):
//! - `>= 8` → critical
//! - `>= 5` → high
//! - `>= 3` → medium
//! - otherwise low

use crate::encoding::WEI_PER_ETHER;
use crate::reputation::ContractInfo;
use crate::transaction::RiskLevel;

/// Upper bound of any single assessment factor.
pub const MAX_FACTOR: u8 = 4;

/// Score thresholds for each risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelThresholds {
    pub critical: u8,
    pub high: u8,
    pub medium: u8,
}

/// Tier tables shared by every scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskPolicy {
    /// Strictly-greater-than wei thresholds adding 1, 2, 3, 4.
    pub value_tiers_wei: [u128; 4],
    /// Strictly-greater-than gas thresholds adding 1, 2.
    pub gas_tiers: [u64; 2],
    pub levels: LevelThresholds,
    /// Wei above which the decoder emits a value warning.
    pub high_value_warning_wei: u128,
    /// Wei above which the assessor recommends extra verification.
    pub large_transfer_wei: u128,
    /// Gas above which warnings and recommendations mention gas cost.
    pub high_gas: u64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            value_tiers_wei: [
                WEI_PER_ETHER / 10,
                WEI_PER_ETHER,
                5 * WEI_PER_ETHER,
                10 * WEI_PER_ETHER,
            ],
            gas_tiers: [200_000, 300_000],
            levels: LevelThresholds {
                critical: 8,
                high: 5,
                medium: 3,
            },
            high_value_warning_wei: 10 * WEI_PER_ETHER,
            large_transfer_wei: 5 * WEI_PER_ETHER,
            high_gas: 300_000,
        }
    }
}

impl RiskPolicy {
    /// 0..=4 by how many value thresholds `wei` exceeds.
    pub fn value_tier(&self, wei: u128) -> u8 {
        self.value_tiers_wei.iter().filter(|&&t| wei > t).count() as u8
    }

    /// 0..=2 by how many gas thresholds `gas` exceeds.
    pub fn gas_tier(&self, gas: u64) -> u8 {
        self.gas_tiers.iter().filter(|&&t| gas > t).count() as u8
    }

    pub fn base_weight(&self, tier: RiskLevel) -> u8 {
        match tier {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::Critical => 4,
        }
    }

    /// Extra weight for functions that hand over control of funds or are unidentified.
    pub fn function_penalty(&self, function_name: &str) -> u8 {
        match function_name {
            crate::signatures::UNKNOWN_FUNCTION => 4,
            "approve" | "setApprovalForAll" | "addLiquidity" => 2,
            name if is_swap(name) => 2,
            _ => 0,
        }
    }

    /// Function factor for the assessment engine, clamped to the factor range.
    pub fn function_factor(&self, tier: RiskLevel, function_name: &str) -> u8 {
        (self.base_weight(tier) + self.function_penalty(function_name)).min(MAX_FACTOR)
    }

    /// Contract trust factor: 0 for well-reputed verified contracts, 3 for no signal.
    pub fn contract_tier(&self, info: Option<&ContractInfo>) -> u8 {
        match info {
            None => 3,
            Some(c) if !c.verified => 3,
            Some(c) if c.reputation >= 90 => 0,
            Some(c) if c.reputation >= 70 => 1,
            Some(c) if c.reputation >= 50 => 2,
            Some(_) => 3,
        }
    }

    pub fn level_for_score(&self, score: u32) -> RiskLevel {
        if score >= self.levels.critical as u32 {
            RiskLevel::Critical
        } else if score >= self.levels.high as u32 {
            RiskLevel::High
        } else if score >= self.levels.medium as u32 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Whether a function name denotes a swap.
pub fn is_swap(function_name: &str) -> bool {
    function_name.to_ascii_lowercase().contains("swap")
}
