//! Core data types for pre-signature transaction analysis.
//!
//! Defines the risk tiers, transaction kinds, the raw request a wallet is
//! about to sign, the decoded classification, and the transaction record the
//! narration engine describes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::encoding::{self, RawParameters};
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Risk tiers
// ---------------------------------------------------------------------------

/// Coarse qualitative risk bucket. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// High or critical.
    pub fn is_elevated(&self) -> bool {
        *self >= Self::High
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!(
                "unknown risk level '{other}', expected low/medium/high/critical"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction kinds
// ---------------------------------------------------------------------------

/// What a transaction does, as far as narration is concerned.
///
/// Unrecognized kinds are kept verbatim so the fallback narration can still
/// name them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionKind {
    EthTransfer,
    TokenTransfer,
    TokenApproval,
    Swap,
    LiquidityAdd,
    LiquidityRemove,
    Lending,
    NftTransfer,
    ContractInteraction,
    Other(String),
}

impl TransactionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::EthTransfer => "eth_transfer",
            Self::TokenTransfer => "token_transfer",
            Self::TokenApproval => "token_approval",
            Self::Swap => "swap",
            Self::LiquidityAdd => "liquidity_add",
            Self::LiquidityRemove => "liquidity_remove",
            Self::Lending => "lending",
            Self::NftTransfer => "nft_transfer",
            Self::ContractInteraction => "contract_interaction",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TransactionKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "eth_transfer" => Self::EthTransfer,
            "token_transfer" => Self::TokenTransfer,
            "token_approval" => Self::TokenApproval,
            "swap" => Self::Swap,
            "liquidity_add" => Self::LiquidityAdd,
            "liquidity_remove" => Self::LiquidityRemove,
            "lending" => Self::Lending,
            "nft_transfer" => Self::NftTransfer,
            "contract_interaction" => Self::ContractInteraction,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for TransactionKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<TransactionKind> for String {
    fn from(kind: TransactionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Requests and decoded results
// ---------------------------------------------------------------------------

/// A transaction as presented to the wallet before signing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Recipient contract or account.
    #[serde(default)]
    pub to: String,
    /// Hex calldata.
    #[serde(default)]
    pub data: String,
    /// Wei amount, hex (`0x..`) or decimal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl TransactionRequest {
    pub fn new(to: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            data: data.into(),
            value: None,
            from: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Value in wei; unparsable values count as zero.
    pub fn value_wei(&self) -> u128 {
        encoding::parse_wei(self.value.as_deref()).unwrap_or(0)
    }

    /// Strict validation used by batch analysis.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !encoding::is_address(&self.to) {
            return Err(AnalysisError::InvalidAddress(self.to.clone()));
        }
        if let Some(from) = &self.from {
            if !encoding::is_address(from) {
                return Err(AnalysisError::InvalidAddress(from.clone()));
            }
        }
        if self.data.trim().is_empty() {
            return Err(AnalysisError::InvalidCalldata("missing data field".to_string()));
        }
        encoding::parse_calldata(&self.data)?;
        encoding::parse_wei(self.value.as_deref())?;
        Ok(())
    }
}

/// Structured classification of a transaction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedTransaction {
    pub function_name: String,
    pub contract_address: String,
    pub protocol: String,
    pub risk_level: RiskLevel,
    /// Registry tier of the matched descriptor, before value and gas.
    pub base_risk_tier: RiskLevel,
    pub explanation: String,
    pub warnings: Vec<String>,
    pub gas_estimate: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_parameters: Option<RawParameters>,
}

impl DecodedTransaction {
    pub fn is_unknown(&self) -> bool {
        self.function_name == crate::signatures::UNKNOWN_FUNCTION
    }
}

// ---------------------------------------------------------------------------
// Narration input
// ---------------------------------------------------------------------------

/// A token movement observed in (or implied by) a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenTransfer {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    /// Decimal amount in token units.
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub decimals: u8,
}

/// Transaction description consumed by the narration engine.
///
/// Any field not modelled here is kept in `extra` so templates can still
/// reference it by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    /// Decimal native-currency amount, e.g. `"1.5"`.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub gas_used: String,
    #[serde(default)]
    pub gas_price: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub tokens: Vec<TokenTransfer>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TransactionRecord {
    pub fn new(kind: TransactionKind) -> Self {
        Self {
            hash: None,
            from: String::new(),
            to: String::new(),
            value: "0".to_string(),
            gas_used: "0".to_string(),
            gas_price: "0".to_string(),
            kind,
            protocol: String::new(),
            method: String::new(),
            tokens: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Native value as a float; unparsable values count as zero.
    pub fn value_f64(&self) -> f64 {
        parse_decimal(&self.value).unwrap_or(0.0)
    }

    /// Gas used; `None` when absent or unparsable.
    pub fn gas_used_u64(&self) -> Option<u64> {
        self.gas_used.trim().parse().ok()
    }

    pub fn first_token(&self) -> Option<&TokenTransfer> {
        self.tokens.first()
    }

    /// Whether the protocol is set and not the literal `unknown`.
    pub fn has_known_protocol(&self) -> bool {
        !self.protocol.is_empty() && !self.protocol.eq_ignore_ascii_case("unknown")
    }
}

/// Parse a finite decimal number.
pub(crate) fn parse_decimal(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_order_and_parse() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert!(RiskLevel::High.is_elevated());
        assert!(!RiskLevel::Medium.is_elevated());
        assert_eq!("HIGH".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert!("severe".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_risk_level_serializes_lowercase() {
        let json = serde_json::to_string(&RiskLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn test_kind_keeps_unrecognized_label() {
        let kind: TransactionKind = serde_json::from_str("\"bridge\"").unwrap();
        assert_eq!(kind, TransactionKind::Other("bridge".to_string()));
        assert_eq!(kind.as_str(), "bridge");

        let kind: TransactionKind = serde_json::from_str("\"liquidity_add\"").unwrap();
        assert_eq!(kind, TransactionKind::LiquidityAdd);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"liquidity_add\"");
    }

    #[test]
    fn test_request_validation() {
        let ok = TransactionRequest::new(
            "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D",
            "0x38ed1739",
        )
        .with_value("0x0");
        assert!(ok.validate().is_ok());

        let bad_to = TransactionRequest::new("0x1234", "0x38ed1739");
        assert!(matches!(bad_to.validate(), Err(AnalysisError::InvalidAddress(_))));

        let missing_data = TransactionRequest::new("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D", "");
        assert!(matches!(
            missing_data.validate(),
            Err(AnalysisError::InvalidCalldata(_))
        ));

        let bad_value = ok.clone().with_value("lots");
        assert!(matches!(bad_value.validate(), Err(AnalysisError::InvalidValue { .. })));
    }

    #[test]
    fn test_request_missing_fields_deserialize_empty() {
        let req: TransactionRequest = serde_json::from_str(r#"{"value":"0x1"}"#).unwrap();
        assert!(req.to.is_empty());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_record_extra_fields_round_trip() {
        let json = r#"{
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x2222222222222222222222222222222222222222",
            "value": "1.5",
            "gasUsed": "21000",
            "type": "eth_transfer",
            "protocol": "Ethereum",
            "method": "transfer",
            "fee": "0.3"
        }"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, TransactionKind::EthTransfer);
        assert_eq!(record.value_f64(), 1.5);
        assert_eq!(record.gas_used_u64(), Some(21000));
        assert_eq!(record.extra.get("fee").and_then(|v| v.as_str()), Some("0.3"));
        assert!(record.has_known_protocol());
    }
}
