//! Analysis report schema.
//!
//! A report bundles everything computed for one transaction request and binds
//! it to the request through a SHA-256 commitment over the request's
//! canonical JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::encoding::format_ether;
use crate::narration::NarrationResult;
use crate::reputation::ContractInfo;
use crate::risk::RiskFactors;
use crate::transaction::{DecodedTransaction, RiskLevel, TransactionRequest};

/// Version of the report schema
pub const REPORT_VERSION: &str = "1.0.0";

/// Calldata longer than this is truncated in the transaction summary.
pub const DATA_PREVIEW_LEN: usize = 66;

const UNKNOWN_CONTRACT_WARNING: &str =
    "Contract not found in reputation registry. Proceed with caution.";

/// Echo of the analyzed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Value as supplied by the caller.
    pub value: String,
    pub value_eth: f64,
    /// Calldata, truncated for display.
    pub data: String,
}

impl TransactionSummary {
    pub fn from_request(request: &TransactionRequest) -> Self {
        Self {
            to: request.to.clone(),
            from: request.from.clone(),
            value: request.value.clone().unwrap_or_else(|| "0".to_string()),
            value_eth: format_ether(request.value_wei()),
            data: preview_data(&request.data),
        }
    }
}

/// Result of analyzing one transaction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub version: String,
    pub report_id: String,
    pub timestamp: DateTime<Utc>,
    /// `sha256:` commitment to the analyzed request.
    pub commitment: String,
    pub transaction: TransactionSummary,
    pub decoded: DecodedTransaction,
    pub risk: RiskFactors,
    pub contract: ContractInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_warning: Option<String>,
    pub narration: NarrationResult,
}

impl AnalysisReport {
    /// Assemble a report. A missing contract entry is replaced by the unknown
    /// placeholder and flagged with a warning.
    pub fn new(
        request: &TransactionRequest,
        decoded: DecodedTransaction,
        risk: RiskFactors,
        contract: Option<ContractInfo>,
        narration: NarrationResult,
    ) -> Self {
        let (contract, contract_warning) = match contract {
            Some(info) => (info, None),
            None => (
                ContractInfo::unknown(&request.to),
                Some(UNKNOWN_CONTRACT_WARNING.to_string()),
            ),
        };

        Self {
            version: REPORT_VERSION.to_string(),
            report_id: generate_report_id(),
            timestamp: Utc::now(),
            commitment: compute_commitment(request),
            transaction: TransactionSummary::from_request(request),
            decoded,
            risk,
            contract,
            contract_warning,
            narration,
        }
    }

    /// The assessment engine's verdict.
    pub fn overall_risk(&self) -> RiskLevel {
        self.risk.overall_risk
    }

    /// Check the report was produced for exactly this request.
    pub fn verify_commitment(&self, request: &TransactionRequest) -> bool {
        self.commitment == compute_commitment(request)
    }
}

/// SHA-256 commitment over the request's canonical JSON.
pub fn compute_commitment(request: &TransactionRequest) -> String {
    let canonical = serde_json::to_string(request).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

fn preview_data(data: &str) -> String {
    if data.chars().count() > DATA_PREVIEW_LEN {
        let head: String = data.chars().take(DATA_PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        data.to_string()
    }
}

/// Generate a unique report ID
fn generate_report_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(rand_bytes());
    let hash = hasher.finalize();

    format!("pg_{}", hex::encode(&hash[..8]))
}

fn rand_bytes() -> [u8; 16] {
    let mut bytes = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::{GasEfficiency, NarrationMetadata};

    const ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";

    fn sample_report(request: &TransactionRequest, contract: Option<ContractInfo>) -> AnalysisReport {
        let decoded = crate::decoder::TransactionDecoder::default().decode(request);
        let risk = crate::risk::RiskAssessor::default().assess(&decoded, request);
        let narration = NarrationResult {
            text: "You performed a token swap on Uniswap.".to_string(),
            metadata: NarrationMetadata {
                category: "swap".to_string(),
                risk_level: RiskLevel::Medium,
                gas_efficiency: GasEfficiency::Good,
                tags: vec!["swap".to_string()],
            },
        };
        AnalysisReport::new(request, decoded, risk, contract, narration)
    }

    #[test]
    fn test_report_serialization() {
        let request = TransactionRequest::new(ROUTER, "0x38ed1739").with_value("0x0");
        let report = sample_report(&request, None);

        assert!(report.report_id.starts_with("pg_"));
        assert_eq!(report.report_id.len(), 3 + 16);
        assert_eq!(report.contract.name, "Unknown Contract");
        assert!(report.contract_warning.is_some());

        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"reportId\""));
        assert!(json.contains("\"overallRisk\": \"medium\""));
        assert!(json.contains("\"functionName\": \"swapExactTokensForTokens\""));

        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.commitment, report.commitment);
        assert_eq!(parsed.overall_risk(), RiskLevel::Medium);
    }

    #[test]
    fn test_commitment_verification() {
        let request = TransactionRequest::new(ROUTER, "0x38ed1739").with_value("0x0");
        let report = sample_report(&request, Some(ContractInfo::unknown(ROUTER)));

        assert!(report.commitment.starts_with("sha256:"));
        assert_eq!(report.commitment.len(), 71);
        assert!(report.contract_warning.is_none());
        assert!(report.verify_commitment(&request));

        let tampered = request.clone().with_value("0xde0b6b3a7640000");
        assert!(!report.verify_commitment(&tampered));
    }

    #[test]
    fn test_report_ids_are_unique() {
        let request = TransactionRequest::new(ROUTER, "0x");
        let a = sample_report(&request, None);
        let b = sample_report(&request, None);
        assert_ne!(a.report_id, b.report_id);
        assert_eq!(a.commitment, b.commitment);
    }

    #[test]
    fn test_long_data_is_truncated() {
        let data = format!("0x38ed1739{}", "00".repeat(64));
        let summary = TransactionSummary::from_request(&TransactionRequest::new(ROUTER, data));
        assert_eq!(summary.data.len(), DATA_PREVIEW_LEN + 3);
        assert!(summary.data.ends_with("..."));
        assert_eq!(summary.value, "0");

        let short = TransactionSummary::from_request(&TransactionRequest::new(ROUTER, "0xa9059cbb"));
        assert_eq!(short.data, "0xa9059cbb");
    }
}
