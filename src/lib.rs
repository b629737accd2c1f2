//! presign-guard: pre-signature transaction risk analysis.
//!
//! Explains what a wallet is about to sign before it signs it. A request
//! (`to`, `data`, `value`, `from`) is decoded against a table of known
//! function selectors, scored against a contract reputation table, and
//! described in one plain-English sentence.
//!
//! # Pipeline
//!
//! - **Decode**: selector lookup, quick risk label, explanation, warnings
//! - **Assess**: value / function / contract / gas factors and recommendations
//! - **Narrate**: template-driven sentence with a canned fallback
//!
//! Every stage is a pure function over registries built once at startup.

pub mod batch;
pub mod config;
pub mod decoder;
pub mod encoding;
pub mod error;
pub mod metrics;
pub mod narration;
pub mod policy;
pub mod report;
pub mod reputation;
pub mod risk;
pub mod signatures;
pub mod templates;
pub mod transaction;

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, DEFAULT_MAX_BATCH_SIZE};
use crate::decoder::TransactionDecoder;
use crate::encoding::ether_string;
use crate::error::TemplateStoreError;
use crate::narration::Narrator;
use crate::report::AnalysisReport;
use crate::reputation::ReputationRegistry;
use crate::risk::RiskAssessor;
use crate::templates::InMemoryTemplateStore;
use crate::transaction::{DecodedTransaction, TransactionKind, TransactionRecord, TransactionRequest};

pub use crate::batch::{BatchItemResult, BatchReport};
pub use crate::error::AnalysisError;
pub use crate::transaction::RiskLevel;

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Runs decode, assess, and narrate for one request or a batch.
#[derive(Clone)]
pub struct Analyzer {
    decoder: TransactionDecoder,
    assessor: RiskAssessor,
    narrator: Narrator,
    max_batch_size: usize,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(
            TransactionDecoder::default(),
            RiskAssessor::default(),
            Narrator::default(),
        )
    }
}

impl Analyzer {
    pub fn new(decoder: TransactionDecoder, assessor: RiskAssessor, narrator: Narrator) -> Self {
        Self {
            decoder,
            assessor,
            narrator,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Build from config: extra contracts are merged into the reputation
    /// table and `templates_path`, if set, backs the narration store.
    pub fn from_config(config: &Config) -> Result<Self, TemplateStoreError> {
        let reputation =
            ReputationRegistry::builtin().with_entries(config.contracts.clone().unwrap_or_default());
        let store = match &config.templates_path {
            Some(path) => InMemoryTemplateStore::load(path)?,
            None => InMemoryTemplateStore::default(),
        };

        let assessor = RiskAssessor::new(Default::default(), Arc::new(reputation));
        let narrator = Narrator::new(Arc::new(store));
        Ok(Self::new(TransactionDecoder::default(), assessor, narrator)
            .with_max_batch_size(config.max_batch_size()))
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_narrator(mut self, narrator: Narrator) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn decoder(&self) -> &TransactionDecoder {
        &self.decoder
    }

    pub fn assessor(&self) -> &RiskAssessor {
        &self.assessor
    }

    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    /// Analyze one request. Never fails: malformed input yields the unknown
    /// classification.
    pub fn analyze(&self, request: &TransactionRequest) -> AnalysisReport {
        let start = Instant::now();

        let decoded = self.decoder.decode(request);
        let risk = self.assessor.assess(&decoded, request);
        let contract = self.assessor.reputation().contract_info(&request.to);
        let narration = self.narrator.narrate(&self.narration_record(request, &decoded));

        let overall = risk.overall_risk;
        let report = AnalysisReport::new(request, decoded, risk, contract, narration);

        let duration_ms = start.elapsed().as_millis() as u64;
        crate::metrics::record_analysis(overall.as_str(), duration_ms);
        tracing::debug!(
            report_id = %report.report_id,
            function = %report.decoded.function_name,
            risk = %overall,
            duration_ms,
            "analysis complete"
        );
        report
    }

    /// Narration input for a request that has not been mined yet.
    pub fn narration_record(&self, request: &TransactionRequest, decoded: &DecodedTransaction) -> TransactionRecord {
        let kind = self
            .decoder
            .resolve(request)
            .map(|d| d.category.clone())
            .unwrap_or(TransactionKind::ContractInteraction);

        let mut record = TransactionRecord::new(kind);
        record.from = request.from.clone().unwrap_or_default();
        record.to = request.to.clone();
        record.value = ether_string(request.value_wei());
        record.gas_used = decoded.gas_estimate.to_string();
        record.protocol = decoded.protocol.clone();
        record.method = decoded.function_name.clone();
        record
    }
}
