//! Narration templates and the template store interface.
//!
//! Templates are owned by an external store. The narrator only reads them,
//! first by exact (protocol, method) and then by category.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::TemplateStoreError;
use crate::transaction::RiskLevel;

/// A placeholder a template expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub name: String,
    #[serde(rename = "type", default = "default_variable_type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

/// A narration template with `{variable}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationTemplate {
    pub protocol: String,
    pub method: String,
    #[serde(default)]
    pub function_signature: Option<String>,
    pub template: String,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    pub category: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub gas_estimate: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn default_variable_type() -> String {
    "string".to_string()
}

/// Read-only template lookup.
pub trait TemplateStore: Send + Sync {
    fn find_by_method(&self, protocol: &str, method: &str) -> Result<Option<NarrationTemplate>, TemplateStoreError>;

    fn find_by_category(&self, category: &str) -> Result<Option<NarrationTemplate>, TemplateStoreError>;
}

/// Order in which the narrator asks the store for a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    ExactMethod,
    Category,
}

impl MatchStrategy {
    pub const ORDER: [MatchStrategy; 2] = [MatchStrategy::ExactMethod, MatchStrategy::Category];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactMethod => "exact_method",
            Self::Category => "category",
        }
    }
}

/// Template store backed by a list held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    templates: Vec<NarrationTemplate>,
}

impl InMemoryTemplateStore {
    pub fn new(templates: Vec<NarrationTemplate>) -> Self {
        Self { templates }
    }

    /// Parse a JSON array of templates.
    pub fn from_json_str(json: &str) -> Result<Self, TemplateStoreError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn load(path: &Path) -> Result<Self, TemplateStoreError> {
        let content = std::fs::read_to_string(path)?;
        let store = Self::from_json_str(&content)?;
        tracing::info!(path = %path.display(), count = store.len(), "loaded narration templates");
        Ok(store)
    }

    /// Built-in template set for common protocols.
    pub fn seeded() -> Self {
        Self::new(seed_templates())
    }

    /// Append templates; earlier entries win on lookup.
    pub fn extend(&mut self, other: InMemoryTemplateStore) {
        self.templates.extend(other.templates);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn active(&self) -> impl Iterator<Item = &NarrationTemplate> {
        self.templates.iter().filter(|t| t.is_active)
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn find_by_method(&self, protocol: &str, method: &str) -> Result<Option<NarrationTemplate>, TemplateStoreError> {
        Ok(self
            .active()
            .find(|t| t.protocol.eq_ignore_ascii_case(protocol) && t.method.eq_ignore_ascii_case(method))
            .cloned())
    }

    fn find_by_category(&self, category: &str) -> Result<Option<NarrationTemplate>, TemplateStoreError> {
        Ok(self.active().find(|t| t.category == category).cloned())
    }
}

fn var(name: &str, description: &str) -> TemplateVariable {
    TemplateVariable {
        name: name.to_string(),
        kind: default_variable_type(),
        description: description.to_string(),
        required: true,
    }
}

#[allow(clippy::too_many_arguments)]
fn seed(
    protocol: &str,
    method: &str,
    signature: &str,
    template: &str,
    variables: Vec<TemplateVariable>,
    category: &str,
    risk_level: RiskLevel,
    gas_estimate: u64,
    tags: &[&str],
) -> NarrationTemplate {
    NarrationTemplate {
        protocol: protocol.to_string(),
        method: method.to_string(),
        function_signature: Some(signature.to_string()),
        template: template.to_string(),
        variables,
        category: category.to_string(),
        risk_level,
        gas_estimate,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        is_active: true,
    }
}

fn seed_templates() -> Vec<NarrationTemplate> {
    vec![
        seed(
            "uniswap",
            "swapExactTokensForTokens",
            "0x38ed1739",
            "You swapped {tokenAmount} {tokenSymbol} for {outputAmount} {outputSymbol} on Uniswap with a {fee}% fee.",
            vec![
                var("tokenAmount", "Amount of input tokens"),
                var("tokenSymbol", "Symbol of input token"),
                var("outputAmount", "Amount of output tokens"),
                var("outputSymbol", "Symbol of output token"),
                var("fee", "Trading fee percentage"),
            ],
            "swap",
            RiskLevel::Medium,
            180_000,
            &["defi", "swap", "uniswap", "trading"],
        ),
        seed(
            "uniswap",
            "swapExactETHForTokens",
            "0x7ff36ab5",
            "You swapped {ethAmount} ETH for {tokenAmount} {tokenSymbol} on Uniswap.",
            vec![
                var("ethAmount", "Amount of ETH swapped"),
                var("tokenAmount", "Amount of tokens received"),
                var("tokenSymbol", "Symbol of token received"),
            ],
            "swap",
            RiskLevel::Medium,
            160_000,
            &["defi", "swap", "uniswap", "eth"],
        ),
        seed(
            "uniswap",
            "addLiquidity",
            "0x02751cec",
            "You added liquidity to a {tokenA}/{tokenB} pool on Uniswap with {amountA} {tokenA} and {amountB} {tokenB}.",
            vec![
                var("tokenA", "First token symbol"),
                var("tokenB", "Second token symbol"),
                var("amountA", "Amount of first token"),
                var("amountB", "Amount of second token"),
            ],
            "liquidity_add",
            RiskLevel::High,
            200_000,
            &["defi", "liquidity", "uniswap", "lp"],
        ),
        seed(
            "erc20",
            "transfer",
            "0xa9059cbb",
            "You transferred {amount} {symbol} to {recipient}.",
            vec![
                var("amount", "Amount transferred"),
                var("symbol", "Token symbol"),
                var("recipient", "Recipient address"),
            ],
            "token_transfer",
            RiskLevel::Low,
            65_000,
            &["erc20", "transfer", "token"],
        ),
        seed(
            "erc20",
            "approve",
            "0x095ea7b3",
            "You approved {spender} to spend {amount} {symbol} on your behalf.",
            vec![
                var("spender", "Spender address"),
                var("amount", "Approved amount"),
                var("symbol", "Token symbol"),
            ],
            "token_approval",
            RiskLevel::Medium,
            46_000,
            &["erc20", "approval", "token"],
        ),
        seed(
            "compound",
            "mint",
            "0x1249c58b",
            "You deposited {amount} {symbol} into Compound to earn interest.",
            vec![var("amount", "Amount deposited"), var("symbol", "Token symbol")],
            "lending",
            RiskLevel::Medium,
            150_000,
            &["defi", "lending", "compound", "yield"],
        ),
        seed(
            "compound",
            "repayBorrow",
            "0x852a12e3",
            "You repaid {amount} {symbol} borrowed from Compound.",
            vec![var("amount", "Amount repaid"), var("symbol", "Token symbol")],
            "lending",
            RiskLevel::Low,
            120_000,
            &["defi", "lending", "compound", "repay"],
        ),
        seed(
            "aave",
            "deposit",
            "0x617ba037",
            "You deposited {amount} {symbol} into Aave lending pool.",
            vec![var("amount", "Amount deposited"), var("symbol", "Token symbol")],
            "lending",
            RiskLevel::Medium,
            180_000,
            &["defi", "lending", "aave", "yield"],
        ),
        seed(
            "ethereum",
            "transfer",
            "0x",
            "You transferred {amount} ETH to {recipient}.",
            vec![var("amount", "Amount of ETH"), var("recipient", "Recipient address")],
            "eth_transfer",
            RiskLevel::Low,
            21_000,
            &["ethereum", "transfer", "eth"],
        ),
    ]
}
