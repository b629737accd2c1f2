//! Risk assessment engine.
//!
//! Breaks a decoded transaction into four bounded factors (value, function,
//! contract, gas), sums them, and maps the sum to a risk level with the same
//! [`RiskPolicy`] the decoder uses. Recommendations are emitted in priority
//! order and capped.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::policy::{is_swap, RiskPolicy};
use crate::reputation::{ReputationRegistry, ReputationStore};
use crate::transaction::{DecodedTransaction, RiskLevel, TransactionRequest};

/// Maximum number of recommendations returned.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Factor breakdown for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub value_risk: u8,
    pub function_risk: u8,
    pub contract_risk: u8,
    pub gas_risk: u8,
    pub overall_score: u32,
    pub overall_risk: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Scores decoded transactions against the reputation store.
#[derive(Clone)]
pub struct RiskAssessor {
    policy: RiskPolicy,
    reputation: Arc<dyn ReputationStore>,
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self::new(RiskPolicy::default(), Arc::new(ReputationRegistry::builtin()))
    }
}

impl RiskAssessor {
    pub fn new(policy: RiskPolicy, reputation: Arc<dyn ReputationStore>) -> Self {
        Self { policy, reputation }
    }

    pub fn reputation(&self) -> &dyn ReputationStore {
        self.reputation.as_ref()
    }

    /// Assess a decoded transaction together with the request it came from.
    pub fn assess(&self, decoded: &DecodedTransaction, request: &TransactionRequest) -> RiskFactors {
        let p = &self.policy;
        let wei = request.value_wei();
        let contract = self.reputation.contract_info(&request.to);

        let value_risk = p.value_tier(wei);
        let function_risk = p.function_factor(decoded.base_risk_tier, &decoded.function_name);
        let contract_risk = p.contract_tier(contract.as_ref());
        let gas_risk = p.gas_tier(decoded.gas_estimate);

        let overall_score = [value_risk, function_risk, contract_risk, gas_risk]
            .iter()
            .map(|&f| f as u32)
            .sum();
        let overall_risk = p.level_for_score(overall_score);
        let recommendations = self.recommendations(decoded, wei, contract.is_none(), overall_risk);

        RiskFactors {
            value_risk,
            function_risk,
            contract_risk,
            gas_risk,
            overall_score,
            overall_risk,
            recommendations,
        }
    }

    fn recommendations(
        &self,
        decoded: &DecodedTransaction,
        wei: u128,
        contract_unknown: bool,
        overall_risk: RiskLevel,
    ) -> Vec<String> {
        let mut recs = Recommendations::default();
        let name = decoded.function_name.as_str();

        if overall_risk.is_elevated() {
            recs.push("Verify the contract address on a block explorer");
            recs.push("Consider testing with a small amount first");
        }

        if contract_unknown {
            recs.push("Check whether the contract source is verified");
            recs.push("Research the project and read independent reviews");
        }

        if matches!(name, "approve" | "setApprovalForAll") {
            recs.push("Use limited approvals instead of unlimited amounts");
            recs.push("Revoke unused approvals regularly");
        }

        if name == "addLiquidity" {
            recs.push("Understand impermanent loss before providing liquidity");
            recs.push("Monitor your position regularly");
        }

        if is_swap(name) {
            recs.push("Check your slippage tolerance settings");
            recs.push("Consider transaction timing during high volatility");
        }

        if wei > self.policy.large_transfer_wei {
            recs.push("Double-check the recipient address for large transfers");
            recs.push("Consider using a hardware wallet for large transactions");
        }

        if decoded.gas_estimate > self.policy.high_gas {
            recs.push("Gas usage is high; wait for lower gas prices if not urgent");
        }

        recs.finish()
    }
}

/// Ordered, de-duplicated recommendation list.
#[derive(Default)]
struct Recommendations(Vec<String>);

impl Recommendations {
    fn push(&mut self, rec: &str) {
        if !self.0.iter().any(|r| r == rec) {
            self.0.push(rec.to_string());
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.0.truncate(MAX_RECOMMENDATIONS);
        self.0
    }
}
