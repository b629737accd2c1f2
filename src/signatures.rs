//! Function signature registry.
//!
//! Static table mapping 4-byte selectors to what the function does, which
//! protocol it belongs to, its base risk tier, and a typical gas cost. Built
//! once per process and never mutated.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::transaction::{RiskLevel, TransactionKind};

/// Function name reported for selectors missing from the registry.
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// Function name reported for plain native-currency transfers.
pub const VALUE_TRANSFER_FUNCTION: &str = "valueTransfer";

/// Metadata for one known function selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    pub selector: &'static str,
    pub name: &'static str,
    pub protocol: &'static str,
    pub description: &'static str,
    pub base_risk_tier: RiskLevel,
    pub gas_estimate: u64,
    pub category: TransactionKind,
}

impl FunctionDescriptor {
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_FUNCTION
    }
}

static UNKNOWN: FunctionDescriptor = FunctionDescriptor {
    selector: "",
    name: UNKNOWN_FUNCTION,
    protocol: "Unknown",
    description: "Unknown function call",
    base_risk_tier: RiskLevel::High,
    gas_estimate: 200_000,
    category: TransactionKind::ContractInteraction,
};

static VALUE_TRANSFER: FunctionDescriptor = FunctionDescriptor {
    selector: "0x",
    name: VALUE_TRANSFER_FUNCTION,
    protocol: "Ethereum",
    description: "Transfer native currency",
    base_risk_tier: RiskLevel::Low,
    gas_estimate: 21_000,
    category: TransactionKind::EthTransfer,
};

/// Selector-keyed lookup table.
#[derive(Debug)]
pub struct SignatureRegistry {
    by_selector: BTreeMap<&'static str, FunctionDescriptor>,
}

impl SignatureRegistry {
    /// The process-wide built-in registry.
    pub fn builtin() -> &'static SignatureRegistry {
        static REGISTRY: OnceLock<SignatureRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| Self::from_descriptors(builtin_descriptors()))
    }

    pub fn from_descriptors(descriptors: Vec<FunctionDescriptor>) -> Self {
        let by_selector = descriptors.into_iter().map(|d| (d.selector, d)).collect();
        Self { by_selector }
    }

    /// Resolve a selector; unknown selectors yield the `unknown` sentinel.
    pub fn lookup(&self, selector: &str) -> &FunctionDescriptor {
        let key = selector.to_ascii_lowercase();
        match self.by_selector.get(key.as_str()) {
            Some(descriptor) => descriptor,
            None => {
                tracing::debug!(selector = %key, "selector not in registry");
                &UNKNOWN
            }
        }
    }

    /// Descriptor used for empty calldata carrying value.
    pub fn value_transfer(&self) -> &FunctionDescriptor {
        &VALUE_TRANSFER
    }

    pub fn unknown(&self) -> &FunctionDescriptor {
        &UNKNOWN
    }

    /// All registered descriptors in selector order.
    pub fn descriptors(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.by_selector.values()
    }

    pub fn len(&self) -> usize {
        self.by_selector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_selector.is_empty()
    }
}

fn descriptor(
    selector: &'static str,
    name: &'static str,
    protocol: &'static str,
    description: &'static str,
    base_risk_tier: RiskLevel,
    gas_estimate: u64,
    category: TransactionKind,
) -> FunctionDescriptor {
    FunctionDescriptor {
        selector,
        name,
        protocol,
        description,
        base_risk_tier,
        gas_estimate,
        category,
    }
}

fn builtin_descriptors() -> Vec<FunctionDescriptor> {
    use RiskLevel::*;
    use TransactionKind::*;

    vec![
        // ERC20
        descriptor("0xa9059cbb", "transfer", "ERC20", "Transfer tokens", Low, 65_000, TokenTransfer),
        descriptor("0x095ea7b3", "approve", "ERC20", "Approve token spending", Medium, 46_000, TokenApproval),
        descriptor(
            "0x23b872dd",
            "transferFrom",
            "ERC20",
            "Transfer tokens from another address",
            Medium,
            70_000,
            TokenTransfer,
        ),
        // Uniswap V2 router
        descriptor(
            "0x38ed1739",
            "swapExactTokensForTokens",
            "Uniswap",
            "Swap exact amount of tokens for tokens",
            Medium,
            180_000,
            Swap,
        ),
        descriptor("0x7ff36ab5", "swapExactETHForTokens", "Uniswap", "Swap exact ETH for tokens", Medium, 160_000, Swap),
        descriptor("0x18cbafe5", "swapExactTokensForETH", "Uniswap", "Swap exact tokens for ETH", Medium, 170_000, Swap),
        descriptor("0x02751cec", "addLiquidity", "Uniswap", "Add liquidity to pool", High, 200_000, LiquidityAdd),
        descriptor("0xbaa2abde", "removeLiquidity", "Uniswap", "Remove liquidity from pool", Medium, 180_000, LiquidityRemove),
        // ERC721
        descriptor("0x42842e0e", "safeTransferFrom", "ERC721", "Safely transfer NFT", Medium, 80_000, NftTransfer),
        descriptor("0x6352211e", "ownerOf", "ERC721", "Check NFT owner", Low, 25_000, ContractInteraction),
        descriptor(
            "0xa22cb465",
            "setApprovalForAll",
            "ERC721",
            "Grant an operator control over every NFT in a collection",
            High,
            50_000,
            TokenApproval,
        ),
        // Lending
        descriptor("0x1249c58b", "mint", "Compound", "Deposit and mint cTokens", Medium, 150_000, Lending),
        descriptor("0x2e1a7d4d", "withdraw", "Compound", "Withdraw deposited funds", Low, 120_000, Lending),
        descriptor("0x852a12e3", "repayBorrow", "Compound", "Repay borrowed funds", Low, 120_000, Lending),
        descriptor("0x617ba037", "deposit", "Aave", "Deposit into lending pool", Medium, 180_000, Lending),
    ]
}
