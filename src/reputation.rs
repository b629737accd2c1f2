//! Contract reputation registry.
//!
//! Curated trust data for well-known contract addresses. Lookups are keyed by
//! lowercase address; a missing entry simply means there is no trust signal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trust metadata for a contract address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    #[serde(default)]
    pub address: String,
    pub name: String,
    /// 0 to 100.
    pub reputation: u8,
    pub verified: bool,
    pub category: String,
}

impl ContractInfo {
    /// Placeholder reported for addresses with no registry entry.
    pub fn unknown(address: &str) -> Self {
        Self {
            address: address.to_string(),
            name: "Unknown Contract".to_string(),
            reputation: 50,
            verified: false,
            category: "Unknown".to_string(),
        }
    }
}

/// Read-only reputation lookup.
pub trait ReputationStore: Send + Sync {
    /// Look up an address (any case).
    fn contract_info(&self, address: &str) -> Option<ContractInfo>;
}

/// In-memory reputation table with the built-in entries.
#[derive(Debug, Clone)]
pub struct ReputationRegistry {
    contracts: HashMap<String, ContractInfo>,
}

impl Default for ReputationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReputationRegistry {
    pub fn builtin() -> Self {
        Self::empty().with_entries(builtin_contracts())
    }

    pub fn empty() -> Self {
        Self {
            contracts: HashMap::new(),
        }
    }

    /// Merge entries, replacing any existing entry for the same address.
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = ContractInfo>) -> Self {
        for mut info in entries {
            info.address = info.address.to_lowercase();
            self.contracts.insert(info.address.clone(), info);
        }
        self
    }

    pub fn get(&self, address: &str) -> Option<&ContractInfo> {
        self.contracts.get(&address.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl ReputationStore for ReputationRegistry {
    fn contract_info(&self, address: &str) -> Option<ContractInfo> {
        self.get(address).cloned()
    }
}

fn entry(address: &str, name: &str, reputation: u8, category: &str) -> ContractInfo {
    ContractInfo {
        address: address.to_string(),
        name: name.to_string(),
        reputation,
        verified: true,
        category: category.to_string(),
    }
}

fn builtin_contracts() -> Vec<ContractInfo> {
    vec![
        // Uniswap
        entry("0x7a250d5630b4cf539739df2c5dacb4c659f2488d", "Uniswap V2 Router", 95, "DEX"),
        entry("0xe592427a0aece92de3edee1f18e0157c05861564", "Uniswap V3 Router", 98, "DEX"),
        entry("0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45", "Uniswap V3 Router 2", 98, "DEX"),
        // Lending
        entry("0x3d9819210a31b4961b30ef54be2aed79b9c9cd3b", "Compound Comptroller", 96, "Lending"),
        entry("0x7d2768de32b0b80b7a3454c06bdac94a69ddc7a9", "Aave Lending Pool", 97, "Lending"),
        // Tokens
        entry("0xdac17f958d2ee523a2206206994597c13d831ec7", "Tether (USDT)", 90, "Token"),
        entry("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "USD Coin (USDC)", 95, "Token"),
    ]
}
