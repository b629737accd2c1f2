//! Transaction decoder.
//!
//! Classifies a raw request by its 4-byte selector, labels it with a quick
//! risk estimate from the shared [`RiskPolicy`], and writes the explanation
//! and warnings shown before signing. Malformed input never errors: it
//! degrades to the unknown-transaction result.

use crate::encoding::{self, format_ether, short_address};
use crate::error::AnalysisError;
use crate::policy::{is_swap, RiskPolicy};
use crate::signatures::{FunctionDescriptor, SignatureRegistry};
use crate::transaction::{DecodedTransaction, RiskLevel, TransactionRequest};

/// Native currency symbol used in explanations.
pub const NATIVE_SYMBOL: &str = "ETH";

/// Decodes transaction requests against a signature registry.
#[derive(Debug, Clone)]
pub struct TransactionDecoder {
    signatures: &'static SignatureRegistry,
    policy: RiskPolicy,
}

impl Default for TransactionDecoder {
    fn default() -> Self {
        Self::new(SignatureRegistry::builtin(), RiskPolicy::default())
    }
}

impl TransactionDecoder {
    pub fn new(signatures: &'static SignatureRegistry, policy: RiskPolicy) -> Self {
        Self { signatures, policy }
    }

    pub fn signatures(&self) -> &'static SignatureRegistry {
        self.signatures
    }

    /// Decode a request. Always returns a value.
    pub fn decode(&self, request: &TransactionRequest) -> DecodedTransaction {
        match self.try_decode(request) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(to = %request.to, error = %e, "decode failed, falling back to unknown transaction");
                crate::metrics::record_decode_fallback();
                self.unknown_transaction(request)
            }
        }
    }

    /// Descriptor a request resolves to, or `None` if the request is malformed.
    pub fn resolve(&self, request: &TransactionRequest) -> Option<&'static FunctionDescriptor> {
        let calldata = encoding::parse_calldata(&request.data).ok()?;
        let wei = encoding::parse_wei(request.value.as_deref()).ok()?;
        Some(self.descriptor_for(&calldata, wei))
    }

    fn descriptor_for(&self, calldata: &encoding::Calldata, wei: u128) -> &'static FunctionDescriptor {
        if calldata.is_empty() && wei > 0 {
            self.signatures.value_transfer()
        } else {
            self.signatures.lookup(&calldata.selector())
        }
    }

    fn try_decode(&self, request: &TransactionRequest) -> Result<DecodedTransaction, AnalysisError> {
        if !encoding::is_address(&request.to) {
            return Err(AnalysisError::InvalidAddress(request.to.clone()));
        }
        let calldata = encoding::parse_calldata(&request.data)?;
        let wei = encoding::parse_wei(request.value.as_deref())?;

        let descriptor = self.descriptor_for(&calldata, wei);
        let risk_level = self.assess_risk(descriptor, wei);
        let explanation = self.explanation(descriptor, request, wei);
        let warnings = self.warnings(descriptor, risk_level, wei);

        let raw_parameters = (!calldata.is_empty()).then(|| calldata.parameters());

        Ok(DecodedTransaction {
            function_name: descriptor.name.to_string(),
            contract_address: request.to.clone(),
            protocol: descriptor.protocol.to_string(),
            risk_level,
            base_risk_tier: descriptor.base_risk_tier,
            explanation,
            warnings,
            gas_estimate: descriptor.gas_estimate,
            raw_parameters,
        })
    }

    /// Composite score: base tier + value tier + sensitive-function penalty + gas tier.
    pub fn risk_score(&self, descriptor: &FunctionDescriptor, wei: u128) -> u32 {
        let p = &self.policy;
        p.base_weight(descriptor.base_risk_tier) as u32
            + p.value_tier(wei) as u32
            + p.function_penalty(descriptor.name) as u32
            + p.gas_tier(descriptor.gas_estimate) as u32
    }

    fn assess_risk(&self, descriptor: &FunctionDescriptor, wei: u128) -> RiskLevel {
        self.policy.level_for_score(self.risk_score(descriptor, wei))
    }

    fn explanation(&self, descriptor: &FunctionDescriptor, request: &TransactionRequest, wei: u128) -> String {
        let eth = format_ether(wei);
        let to = short_address(&request.to);
        let with_value = if wei > 0 {
            format!(" with {eth:.4} {NATIVE_SYMBOL}")
        } else {
            String::new()
        };
        let protocol = descriptor.protocol;

        match descriptor.name {
            "transfer" => format!(
                "You are about to transfer tokens through {to}. This is an ERC20 token transfer operation."
            ),
            "approve" => format!(
                "You are about to grant {to} approval to spend your tokens. \
                 This contract will be able to move tokens from your wallet without further permission."
            ),
            "setApprovalForAll" => format!(
                "You are about to give an operator control over every NFT you hold in collection {to}. \
                 The operator can transfer any of them without asking again."
            ),
            "transferFrom" => format!(
                "You are authorizing a transfer of tokens from one address to another through contract {to}."
            ),
            name if is_swap(name) => {
                format!("You are about to execute a token swap on {protocol}{with_value}.")
            }
            "addLiquidity" => format!(
                "You are about to add liquidity to a {protocol} pool. \
                 Your tokens will be locked in the pool and you will receive LP tokens in return."
            ),
            "removeLiquidity" => format!(
                "You are about to remove liquidity from a {protocol} pool and receive your tokens back."
            ),
            "safeTransferFrom" => {
                let from = request
                    .from
                    .as_deref()
                    .map(|f| format!("from {} ", short_address(f)))
                    .unwrap_or_default();
                format!("You are about to transfer an NFT (ERC721 token) {from}through {to}.")
            }
            "ownerOf" => format!("You are about to query the owner of an NFT on {to}. This call moves no assets."),
            "mint" | "deposit" => format!(
                "You are about to deposit funds into the {protocol} lending protocol to earn interest."
            ),
            "withdraw" => format!(
                "You are about to withdraw your deposited funds from the {protocol} lending protocol."
            ),
            "repayBorrow" => format!("You are about to repay borrowed funds on the {protocol} lending protocol."),
            crate::signatures::VALUE_TRANSFER_FUNCTION => {
                format!("You are about to send {eth:.4} {NATIVE_SYMBOL} to {to}.")
            }
            _ => format!(
                "You are about to execute an unknown function on contract {to}{with_value}. \
                 This transaction has not been identified by our security checks."
            ),
        }
    }

    fn warnings(&self, descriptor: &FunctionDescriptor, risk_level: RiskLevel, wei: u128) -> Vec<String> {
        let mut warnings = Vec::new();

        match risk_level {
            RiskLevel::Critical => warnings.push(
                "CRITICAL RISK: This transaction has multiple high-risk factors. Verify every detail carefully."
                    .to_string(),
            ),
            RiskLevel::High => warnings.push(
                "HIGH RISK: This transaction involves significant risk. Double-check before proceeding.".to_string(),
            ),
            _ => {}
        }

        match descriptor.name {
            "approve" | "setApprovalForAll" => {
                warnings.push(
                    "TOKEN APPROVAL: You are granting spending permission. The contract can move your assets \
                     without further approval."
                        .to_string(),
                );
                warnings.push("TIP: Prefer limited approvals over unlimited ones.".to_string());
            }
            "addLiquidity" => {
                warnings.push("LIQUIDITY LOCK: Your tokens will be locked in a liquidity pool.".to_string());
                warnings.push(
                    "IMPERMANENT LOSS: You may lose value if the pooled token prices diverge.".to_string(),
                );
            }
            name if name == crate::signatures::UNKNOWN_FUNCTION => {
                warnings.push("UNKNOWN FUNCTION: This function is not recognized by our security checks.".to_string());
                warnings.push("VERIFY: Check the contract on a block explorer before proceeding.".to_string());
            }
            _ => {}
        }

        if wei > self.policy.high_value_warning_wei {
            warnings.push(format!(
                "HIGH VALUE: You are sending {:.4} {NATIVE_SYMBOL}. Verify the recipient address carefully.",
                format_ether(wei)
            ));
        }

        if descriptor.gas_estimate > self.policy.high_gas {
            warnings.push("HIGH GAS: This transaction will consume significant gas fees.".to_string());
        }

        warnings
    }

    /// Conservative result for requests that could not be decoded.
    pub fn unknown_transaction(&self, request: &TransactionRequest) -> DecodedTransaction {
        let unknown = self.signatures.unknown();
        let wei = request.value_wei();
        let with_value = if wei > 0 {
            format!(" with {:.4} {NATIVE_SYMBOL}", format_ether(wei))
        } else {
            String::new()
        };

        DecodedTransaction {
            function_name: unknown.name.to_string(),
            contract_address: request.to.clone(),
            protocol: unknown.protocol.to_string(),
            risk_level: RiskLevel::High,
            base_risk_tier: unknown.base_risk_tier,
            explanation: format!("Unknown transaction to {}{with_value}.", short_address(&request.to)),
            warnings: vec![
                "UNKNOWN TRANSACTION: Could not decode this transaction.".to_string(),
                "VERIFY: Check the contract on a block explorer before proceeding.".to_string(),
            ],
            gas_estimate: unknown.gas_estimate,
            raw_parameters: None,
        }
    }
}
