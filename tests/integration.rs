//! Integration tests for the presign-guard analyzer.
//!
//! Run with: cargo test --test integration

use std::sync::Arc;

use presign_guard::config::Config;
use presign_guard::decoder::TransactionDecoder;
use presign_guard::encoding::WEI_PER_ETHER;
use presign_guard::error::TemplateStoreError;
use presign_guard::narration::{render, GasEfficiency, Narrator};
use presign_guard::reputation::{ContractInfo, ReputationRegistry, ReputationStore};
use presign_guard::policy::RiskPolicy;
use presign_guard::risk::{RiskAssessor, MAX_RECOMMENDATIONS};
use presign_guard::signatures::{FunctionDescriptor, SignatureRegistry};
use presign_guard::templates::{InMemoryTemplateStore, NarrationTemplate, TemplateStore};
use presign_guard::transaction::{TokenTransfer, TransactionKind, TransactionRecord, TransactionRequest};
use presign_guard::{AnalysisError, Analyzer, RiskLevel};

const UNISWAP_V2_ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";
const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
const UNLISTED: &str = "0x9999999999999999999999999999999999999999";
const ALICE: &str = "0x1111111111111111111111111111111111111111";

fn swap_calldata() -> String {
    format!("0x38ed1739{}", "00".repeat(32 * 5))
}

// ---------------------------------------------------------------------------
// End-to-end pipeline
// ---------------------------------------------------------------------------

#[test]
fn test_swap_on_known_router_end_to_end() {
    let request = TransactionRequest::new(UNISWAP_V2_ROUTER, swap_calldata()).with_value("0x0");
    let report = Analyzer::default().analyze(&request);

    assert_eq!(report.decoded.function_name, "swapExactTokensForTokens");
    assert!(report.decoded.protocol.contains("Uniswap"));
    assert_eq!(report.decoded.risk_level, RiskLevel::Medium);
    assert_eq!(report.risk.contract_risk, 0);
    assert_eq!(report.risk.overall_risk, RiskLevel::Medium);
    assert_eq!(report.contract.reputation, 95);
    assert!(report
        .risk
        .recommendations
        .iter()
        .any(|r| r.contains("slippage")));
    assert_eq!(report.narration.metadata.category, "swap");
    assert_eq!(report.narration.metadata.gas_efficiency, GasEfficiency::Good);
    assert!(report.transaction.data.ends_with("..."));
    assert!(report.verify_commitment(&request));
}

#[test]
fn test_unknown_selector_on_unlisted_contract() {
    let request = TransactionRequest::new(UNLISTED, "0xdeadbeef").with_value("0x0");
    let report = Analyzer::default().analyze(&request);

    assert_eq!(report.decoded.function_name, "unknown");
    assert!(report.decoded.risk_level >= RiskLevel::High);
    assert_eq!(report.risk.function_risk, 4);
    assert_eq!(report.risk.contract_risk, 3);
    assert!(report.risk.overall_risk >= RiskLevel::High);
    assert_eq!(report.contract.name, "Unknown Contract");
    assert!(report.contract_warning.is_some());
    assert_eq!(report.narration.metadata.risk_level, RiskLevel::High);
}

#[test]
fn test_malformed_request_never_errors() {
    let analyzer = Analyzer::default();
    for (to, data, value) in [
        ("", "", None),
        ("0x12", "0x38ed1739", None),
        (UNISWAP_V2_ROUTER, "0xZZZZ", Some("0x1")),
        (UNISWAP_V2_ROUTER, "0x38ed1739", Some("many wei")),
    ] {
        let mut request = TransactionRequest::new(to, data);
        request.value = value.map(str::to_string);
        let report = analyzer.analyze(&request);
        assert_eq!(report.decoded.function_name, "unknown");
        assert_eq!(report.decoded.risk_level, RiskLevel::High);
        assert!(report.risk.recommendations.len() <= MAX_RECOMMENDATIONS);
    }
}

#[test]
fn test_value_monotonicity_across_pipeline() {
    let analyzer = Analyzer::default();
    let mut last = 0;
    for eth_tenths in [0u128, 1, 2, 10, 11, 50, 51, 100, 101, 1000] {
        let wei = eth_tenths * WEI_PER_ETHER / 10;
        let request = TransactionRequest::new(USDT, "0xa9059cbb").with_value(format!("0x{wei:x}"));
        let report = analyzer.analyze(&request);
        assert!(report.risk.overall_score >= last);
        last = report.risk.overall_score;
    }
}

#[test]
fn test_decoder_and_assessor_agree_on_known_contracts() {
    let decoder = TransactionDecoder::default();
    let assessor = RiskAssessor::default();
    for data in ["0xa9059cbb", "0x095ea7b3", "0x38ed1739", "0x7ff36ab5", "0xbaa2abde"] {
        let request = TransactionRequest::new(UNISWAP_V2_ROUTER, data);
        let decoded = decoder.decode(&request);
        let factors = assessor.assess(&decoded, &request);
        assert_eq!(factors.overall_risk, decoded.risk_level, "selector {data}");
    }
}

#[test]
fn test_custom_registry_keeps_scorers_aligned() {
    let registry = SignatureRegistry::from_descriptors(vec![FunctionDescriptor {
        selector: "0x11111111",
        name: "sweepAll",
        protocol: "Custom",
        description: "Move every balance to one address",
        base_risk_tier: RiskLevel::Critical,
        gas_estimate: 350_000,
        category: TransactionKind::ContractInteraction,
    }]);
    let decoder = TransactionDecoder::new(Box::leak(Box::new(registry)), RiskPolicy::default());
    let analyzer = Analyzer::new(decoder, RiskAssessor::default(), Narrator::default());

    let report = analyzer.analyze(&TransactionRequest::new(UNISWAP_V2_ROUTER, "0x11111111"));
    assert_eq!(report.decoded.base_risk_tier, RiskLevel::Critical);
    assert_eq!(report.risk.function_risk, 4);
    assert_eq!(report.risk.gas_risk, 2);
    // 4 + 2 on both sides
    assert_eq!(report.decoded.risk_level, RiskLevel::High);
    assert_eq!(report.risk.overall_risk, report.decoded.risk_level);
    assert!(report.decoded.warnings.iter().any(|w| w.starts_with("HIGH GAS")));
    assert!(report.risk.recommendations.iter().any(|r| r.starts_with("Gas usage is high")));
}

// ---------------------------------------------------------------------------
// Batch analysis
// ---------------------------------------------------------------------------

#[test]
fn test_batch_isolates_malformed_item() {
    let mut requests: Vec<TransactionRequest> = (0..5)
        .map(|_| TransactionRequest::new(UNISWAP_V2_ROUTER, swap_calldata()).with_value("0x0"))
        .collect();
    requests[3].to = "garbage".to_string();

    let batch = Analyzer::default().analyze_batch(&requests).unwrap();
    assert_eq!(batch.total, 5);
    assert_eq!(batch.analyzed, 4);
    for (i, item) in batch.results.iter().enumerate() {
        assert_eq!(item.index, i);
        assert_eq!(item.success, i != 3);
    }
}

/// Reputation store that panics for one address.
struct PanicsOn(&'static str, ReputationRegistry);

impl ReputationStore for PanicsOn {
    fn contract_info(&self, address: &str) -> Option<ContractInfo> {
        if address.eq_ignore_ascii_case(self.0) {
            panic!("reputation backend crashed");
        }
        self.1.contract_info(address)
    }
}

#[test]
fn test_batch_survives_panicking_item() {
    let store = PanicsOn(UNLISTED, ReputationRegistry::builtin());
    let analyzer = Analyzer::new(
        TransactionDecoder::default(),
        RiskAssessor::new(Default::default(), Arc::new(store)),
        Narrator::default(),
    );
    let requests = vec![
        TransactionRequest::new(USDT, "0xa9059cbb"),
        TransactionRequest::new(UNLISTED, "0xa9059cbb"),
        TransactionRequest::new(UNISWAP_V2_ROUTER, "0x38ed1739"),
    ];

    let batch = analyzer.analyze_batch(&requests).unwrap();
    assert_eq!(batch.analyzed, 2);
    assert!(batch.results[0].success);
    assert!(!batch.results[1].success);
    assert!(batch.results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("reputation backend crashed"));
    assert!(batch.results[2].success);
}

#[test]
fn test_batch_cap_from_config() {
    let config = Config::from_toml_str("max_batch_size = 2").unwrap();
    let analyzer = Analyzer::from_config(&config).unwrap();
    let requests = vec![TransactionRequest::new(USDT, "0xa9059cbb"); 3];
    assert!(matches!(
        analyzer.analyze_batch(&requests),
        Err(AnalysisError::BatchTooLarge { size: 3, max: 2 })
    ));
}

// ---------------------------------------------------------------------------
// Narration
// ---------------------------------------------------------------------------

#[test]
fn test_template_substitution_leaves_no_placeholders() {
    let record = {
        let mut r = TransactionRecord::new(TransactionKind::Swap);
        r.from = ALICE.to_string();
        r.to = UNISWAP_V2_ROUTER.to_string();
        r.value = "0".to_string();
        r.gas_used = "180000".to_string();
        r.protocol = "Uniswap".to_string();
        r.method = "swapExactTokensForTokens".to_string();
        r
    };

    let store = InMemoryTemplateStore::seeded();
    let templates = [
        ("uniswap", "swapExactTokensForTokens"),
        ("uniswap", "addLiquidity"),
        ("erc20", "approve"),
        ("compound", "repayBorrow"),
    ];
    for (protocol, method) in templates {
        let template = store.find_by_method(protocol, method).unwrap().unwrap();
        let text = render(&template.template, |_| "x".to_string());
        assert!(!text.contains('{'), "{text}");
    }

    let result = Narrator::new(Arc::new(store)).narrate(&record);
    assert!(!result.text.contains('{'));
    assert!(!result.text.contains('}'));
    assert!(result.text.starts_with("You swapped 0.0000"));
    assert!(result.metadata.tags.contains(&"gas-good".to_string()));
}

#[test]
fn test_narration_with_token_and_free_form_fields() {
    let json = r#"{
        "from": "0x1111111111111111111111111111111111111111",
        "to": "0x2222222222222222222222222222222222222222",
        "value": "0",
        "gasUsed": "65000",
        "type": "token_transfer",
        "protocol": "ERC20",
        "method": "transfer",
        "tokens": [{"symbol": "USDT", "amount": "1000", "decimals": 6}],
        "recipient": "0x3333333333333333333333333333333333333333"
    }"#;
    let record: TransactionRecord = serde_json::from_str(json).unwrap();
    let result = Narrator::new(Arc::new(InMemoryTemplateStore::seeded())).narrate(&record);
    assert_eq!(result.text, "You transferred 1000.0000 USDT to 0x3333...3333.");
    assert_eq!(result.metadata.gas_efficiency, GasEfficiency::Excellent);
}

#[test]
fn test_transfer_template_with_record_fields() {
    let json = r#"[{
        "protocol": "wallet",
        "method": "send",
        "template": "You transferred {amount} {symbol} to {recipient}",
        "variables": [{"name": "amount"}, {"name": "symbol"}, {"name": "recipient"}],
        "category": "eth_transfer",
        "riskLevel": "low"
    }]"#;
    let store = InMemoryTemplateStore::from_json_str(json).unwrap();

    let mut record = TransactionRecord::new(TransactionKind::EthTransfer);
    record.protocol = "wallet".to_string();
    record.method = "send".to_string();
    record.extra.insert("amount".to_string(), serde_json::json!("1.5"));
    record.extra.insert("symbol".to_string(), serde_json::json!("ETH"));
    record.extra.insert(
        "recipient".to_string(),
        serde_json::json!("0xABCD000000000000000000000000000000000000EF01"),
    );

    let result = Narrator::new(Arc::new(store)).narrate(&record);
    assert!(!result.text.contains('{'));
    assert!(result.text.contains("1.5000"));
    assert_eq!(result.text, "You transferred 1.5000 ETH to 0xABCD...EF01");
}

#[test]
fn test_transfer_template_with_numeric_amount() {
    let templates = r#"[{
        "protocol": "wallet",
        "method": "send",
        "template": "You transferred {amount} {symbol} to {recipient}",
        "category": "eth_transfer",
        "riskLevel": "low"
    }]"#;
    let store = InMemoryTemplateStore::from_json_str(templates).unwrap();

    let record: TransactionRecord = serde_json::from_str(
        r#"{
            "type": "eth_transfer",
            "protocol": "wallet",
            "method": "send",
            "amount": 1.5,
            "symbol": "ETH",
            "recipient": "0xABCD000000000000000000000000000000000000EF01"
        }"#,
    )
    .unwrap();

    let result = Narrator::new(Arc::new(store)).narrate(&record);
    assert!(!result.text.contains('{'));
    assert_eq!(result.text, "You transferred 1.5000 ETH to 0xABCD...EF01");
}

struct UnavailableStore;

impl TemplateStore for UnavailableStore {
    fn find_by_method(&self, _: &str, _: &str) -> Result<Option<NarrationTemplate>, TemplateStoreError> {
        Err(TemplateStoreError::Unavailable("timeout".to_string()))
    }

    fn find_by_category(&self, _: &str) -> Result<Option<NarrationTemplate>, TemplateStoreError> {
        Err(TemplateStoreError::Unavailable("timeout".to_string()))
    }
}

#[test]
fn test_store_failure_uses_basic_path_in_pipeline() {
    let analyzer = Analyzer::default().with_narrator(Narrator::new(Arc::new(UnavailableStore)));
    let request = TransactionRequest::new(ALICE, "0x").with_value("2000000000000000000");
    let report = analyzer.analyze(&request);

    assert_eq!(report.decoded.function_name, "valueTransfer");
    assert_eq!(
        report.narration.text,
        "You transferred 2.0000 ETH from Unknown to 0x1111...1111."
    );
    assert_eq!(report.narration.metadata.risk_level, RiskLevel::Medium);
}

#[test]
fn test_token_transfer_record_builder() {
    let mut record = TransactionRecord::new(TransactionKind::TokenTransfer);
    record.tokens.push(TokenTransfer {
        address: USDT.to_string(),
        symbol: String::new(),
        amount: "3.999".to_string(),
        decimals: 6,
    });
    let result = Narrator::default().narrate(&record);
    assert_eq!(result.text, "You transferred 4.00 tokens from Unknown to Unknown.");
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_contract_override_changes_risk() {
    let config = Config::from_toml_str(&format!(
        r#"
        [[contracts]]
        address = "{UNLISTED}"
        name = "Audited Vault"
        reputation = 91
        verified = true
        category = "Vault"
        "#
    ))
    .unwrap();

    let request = TransactionRequest::new(UNLISTED, "0xa9059cbb");
    let before = Analyzer::default().analyze(&request);
    let after = Analyzer::from_config(&config).unwrap().analyze(&request);

    assert_eq!(before.risk.contract_risk, 3);
    assert_eq!(after.risk.contract_risk, 0);
    assert_eq!(after.contract.name, "Audited Vault");
    assert!(after.risk.overall_score < before.risk.overall_score);
}
