//! Narration engine.
//!
//! Turns a [`TransactionRecord`] into one plain-English sentence plus
//! metadata. A template from the injected store is used when one matches;
//! otherwise, or when the store fails, a canned sentence is picked by
//! transaction kind.

use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::encoding::short_address;
use crate::error::{panic_message, TemplateStoreError};
use crate::templates::{InMemoryTemplateStore, MatchStrategy, NarrationTemplate, TemplateStore};
use crate::transaction::{parse_decimal, RiskLevel, TransactionKind, TransactionRecord};

/// Native value above which a transaction is tagged `high-value`.
const HIGH_VALUE: f64 = 10.0;
/// Native value below which a transaction is tagged `micro-transaction`.
const MICRO_VALUE: f64 = 0.01;
/// Native value above which a basic narration is rated medium risk.
const MEDIUM_VALUE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Qualitative gas bucket derived from gas used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasEfficiency {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl GasEfficiency {
    /// Absent or unparsable gas counts as poor.
    pub fn from_gas_used(gas_used: Option<u64>) -> Self {
        match gas_used {
            Some(g) if g < 100_000 => Self::Excellent,
            Some(g) if g < 200_000 => Self::Good,
            Some(g) if g < 300_000 => Self::Fair,
            _ => Self::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationMetadata {
    pub category: String,
    pub risk_level: RiskLevel,
    pub gas_efficiency: GasEfficiency,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationResult {
    pub text: String,
    pub metadata: NarrationMetadata,
}

// ---------------------------------------------------------------------------
// Narrator
// ---------------------------------------------------------------------------

/// Which path produced a narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationPath {
    Template,
    Basic,
}

impl NarrationPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Basic => "basic",
        }
    }
}

#[derive(Clone)]
pub struct Narrator {
    store: Arc<dyn TemplateStore>,
}

impl Default for Narrator {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryTemplateStore::default()))
    }
}

impl Narrator {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self { store }
    }

    /// Describe a transaction. Never fails.
    pub fn narrate(&self, record: &TransactionRecord) -> NarrationResult {
        let (result, path) = match self.find_template(record) {
            Ok(Some(template)) => (from_template(&template, record), NarrationPath::Template),
            Ok(None) => (basic_narration(record), NarrationPath::Basic),
            Err(e) => {
                tracing::warn!(
                    kind = %record.kind,
                    protocol = %record.protocol,
                    error = %e,
                    "template lookup failed, using basic narration"
                );
                (basic_narration(record), NarrationPath::Basic)
            }
        };
        crate::metrics::record_narration(path.as_str());
        result
    }

    fn find_template(&self, record: &TransactionRecord) -> Result<Option<NarrationTemplate>, TemplateStoreError> {
        for strategy in MatchStrategy::ORDER {
            let found = match strategy {
                MatchStrategy::ExactMethod if record.protocol.is_empty() || record.method.is_empty() => continue,
                MatchStrategy::ExactMethod => {
                    self.guarded(|store| store.find_by_method(&record.protocol, &record.method))?
                }
                MatchStrategy::Category => self.guarded(|store| store.find_by_category(record.kind.as_str()))?,
            };
            if let Some(template) = found {
                tracing::debug!(strategy = strategy.as_str(), method = %template.method, "matched template");
                return Ok(Some(template));
            }
        }
        Ok(None)
    }

    /// Run a store call, turning a panic into a store error.
    fn guarded<F>(&self, f: F) -> Result<Option<NarrationTemplate>, TemplateStoreError>
    where
        F: FnOnce(&dyn TemplateStore) -> Result<Option<NarrationTemplate>, TemplateStoreError>,
    {
        let store = self.store.as_ref();
        panic::catch_unwind(AssertUnwindSafe(|| f(store)))
            .unwrap_or_else(|payload| Err(TemplateStoreError::Unavailable(panic_message(payload.as_ref()))))
    }
}

// ---------------------------------------------------------------------------
// Templated path
// ---------------------------------------------------------------------------

fn from_template(template: &NarrationTemplate, record: &TransactionRecord) -> NarrationResult {
    let text = render(&template.template, |name| resolve_variable(name, record));
    let gas_efficiency = GasEfficiency::from_gas_used(record.gas_used_u64());

    let mut tags = template.tags.clone();
    for tag in computed_tags(record, gas_efficiency) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    NarrationResult {
        text,
        metadata: NarrationMetadata {
            category: template.category.clone(),
            risk_level: template.risk_level,
            gas_efficiency,
            tags,
        },
    }
}

/// Replace every `{identifier}` in `template` with `resolve(identifier)`.
///
/// Braces that do not enclose an identifier are copied through. Substituted
/// text is not rescanned.
pub fn render(template: &str, mut resolve: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let ident_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());

        if ident_len > 0 && after[ident_len..].starts_with('}') {
            out.push_str(&resolve(&after[..ident_len]));
            rest = &after[ident_len + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

fn resolve_variable(name: &str, record: &TransactionRecord) -> String {
    let token = record.first_token();
    match name {
        "value" | "ethAmount" => format!("{:.4}", record.value_f64()),
        "amount" | "tokenAmount" => {
            let amount = token
                .and_then(|t| parse_decimal(&t.amount))
                .or_else(|| extra_number(record, name))
                .unwrap_or_else(|| record.value_f64());
            format!("{amount:.4}")
        }
        "symbol" | "tokenSymbol" => token
            .map(|t| t.symbol.clone())
            .filter(|s| !s.is_empty())
            .or_else(|| extra_text(record, name))
            .unwrap_or_else(|| "tokens".to_string()),
        "from" => short_address(&record.from),
        "to" => short_address(&record.to),
        "recipient" | "spender" => {
            short_address(&extra_text(record, name).unwrap_or_else(|| record.to.clone()))
        }
        "protocol" => record.protocol.clone(),
        "method" => record.method.clone(),
        other => field_value(other, record),
    }
}

/// Numeric extra field, given either as a JSON number or a decimal string.
fn extra_number(record: &TransactionRecord, name: &str) -> Option<f64> {
    match record.extra.get(name)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Non-empty extra field as text; numbers and booleans are stringified.
fn extra_text(record: &TransactionRecord, name: &str) -> Option<String> {
    match record.extra.get(name)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        v @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_)) => Some(v.to_string()),
        _ => None,
    }
}

/// Direct field lookup by wire name, including free-form extra fields.
fn field_value(name: &str, record: &TransactionRecord) -> String {
    match name {
        "hash" => record.hash.clone().unwrap_or_default(),
        "gasUsed" => record.gas_used.clone(),
        "gasPrice" => record.gas_price.clone(),
        "type" => record.kind.to_string(),
        _ => match record.extra.get(name) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Basic path
// ---------------------------------------------------------------------------

fn basic_narration(record: &TransactionRecord) -> NarrationResult {
    let from = short_address(&record.from);
    let to = short_address(&record.to);
    let protocol = if record.protocol.is_empty() {
        "an unknown protocol"
    } else {
        record.protocol.as_str()
    };

    let text = match &record.kind {
        TransactionKind::EthTransfer => {
            format!("You transferred {:.4} ETH from {from} to {to}.", record.value_f64())
        }
        TransactionKind::TokenTransfer => match record.first_token() {
            Some(token) => {
                let amount = parse_decimal(&token.amount).unwrap_or(0.0);
                let symbol = if token.symbol.is_empty() { "tokens" } else { token.symbol.as_str() };
                format!("You transferred {amount:.2} {symbol} from {from} to {to}.")
            }
            None => format!("You transferred tokens from {from} to {to}."),
        },
        TransactionKind::Swap => format!("You performed a token swap on {protocol}."),
        TransactionKind::LiquidityAdd => format!("You added liquidity to a {protocol} pool."),
        TransactionKind::LiquidityRemove => format!("You removed liquidity from a {protocol} pool."),
        TransactionKind::Lending => format!("You interacted with {protocol} lending protocol."),
        TransactionKind::ContractInteraction => {
            format!("You interacted with a smart contract on {protocol}.")
        }
        other => format!("You performed a {other} transaction on {protocol}."),
    };

    let gas_efficiency = GasEfficiency::from_gas_used(record.gas_used_u64());
    NarrationResult {
        text,
        metadata: NarrationMetadata {
            category: record.kind.to_string(),
            risk_level: basic_risk_level(record),
            gas_efficiency,
            tags: computed_tags(record, gas_efficiency),
        },
    }
}

fn basic_risk_level(record: &TransactionRecord) -> RiskLevel {
    let value = record.value_f64();
    if record.kind == TransactionKind::ContractInteraction && !record.has_known_protocol() {
        return RiskLevel::High;
    }
    if value > HIGH_VALUE {
        return RiskLevel::High;
    }
    let pool_or_swap = matches!(
        record.kind,
        TransactionKind::Swap | TransactionKind::LiquidityAdd | TransactionKind::LiquidityRemove
    );
    if pool_or_swap || value > MEDIUM_VALUE {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

fn computed_tags(record: &TransactionRecord, gas: GasEfficiency) -> Vec<String> {
    let mut tags = vec![record.kind.to_string()];
    if record.has_known_protocol() {
        tags.push(record.protocol.to_lowercase());
    }
    let value = record.value_f64();
    if value > HIGH_VALUE {
        tags.push("high-value".to_string());
    }
    if value < MICRO_VALUE {
        tags.push("micro-transaction".to_string());
    }
    tags.push(format!("gas-{}", gas.as_str()));
    tags
}
