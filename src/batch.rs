//! Batch analysis.
//!
//! Items are validated and analyzed independently on the rayon pool. A
//! malformed request or a panic inside one item marks only that item failed;
//! results come back in input order.

use rayon::prelude::*;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};

use crate::error::AnalysisError;
use crate::report::AnalysisReport;
use crate::transaction::TransactionRequest;
use crate::Analyzer;

/// Outcome of one batch item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    /// Position in the submitted batch.
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    fn from_outcome(index: usize, outcome: Result<AnalysisReport, AnalysisError>) -> Self {
        match outcome {
            Ok(report) => Self {
                index,
                success: true,
                report: Some(report),
                error: None,
            },
            Err(e) => Self {
                index,
                success: false,
                report: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Per-item results plus counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub results: Vec<BatchItemResult>,
    pub total: usize,
    /// Number of items analyzed successfully.
    pub analyzed: usize,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.total - self.analyzed
    }
}

impl Analyzer {
    /// Analyze up to `max_batch_size` requests.
    ///
    /// Only an empty or oversized batch is rejected as a whole.
    pub fn analyze_batch(&self, requests: &[TransactionRequest]) -> Result<BatchReport, AnalysisError> {
        if requests.is_empty() {
            return Err(AnalysisError::EmptyBatch);
        }
        if requests.len() > self.max_batch_size() {
            return Err(AnalysisError::BatchTooLarge {
                size: requests.len(),
                max: self.max_batch_size(),
            });
        }

        let results: Vec<BatchItemResult> = requests
            .par_iter()
            .enumerate()
            .map(|(index, request)| {
                let outcome = self.analyze_item(request);
                if let Err(e) = &outcome {
                    tracing::warn!(index, to = %request.to, error = %e, "batch item failed");
                }
                crate::metrics::record_batch_item(outcome.is_ok());
                BatchItemResult::from_outcome(index, outcome)
            })
            .collect();

        let analyzed = results.iter().filter(|r| r.success).count();
        tracing::info!(total = requests.len(), analyzed, "batch analysis complete");

        Ok(BatchReport {
            results,
            total: requests.len(),
            analyzed,
        })
    }

    fn analyze_item(&self, request: &TransactionRequest) -> Result<AnalysisReport, AnalysisError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            request.validate()?;
            Ok(self.analyze(request))
        }))
        .unwrap_or_else(|payload| Err(AnalysisError::from_panic(payload)))
    }
}
