//! Metrics for the analysis pipeline.
//!
//! Counters and histograms go through the `metrics` facade. No recorder is
//! installed here; an embedding application installs its own exporter.

use metrics::{counter, histogram};

/// Record a completed single-transaction analysis.
pub fn record_analysis(risk_level: &str, duration_ms: u64) {
    counter!("analyses_total", "risk_level" => risk_level.to_string()).increment(1);
    histogram!("analysis_duration_ms").record(duration_ms as f64);
}

/// Record a decode that fell back to the unknown classification.
pub fn record_decode_fallback() {
    counter!("decode_fallbacks_total").increment(1);
}

/// Record which narration path produced a description.
pub fn record_narration(path: &str) {
    counter!("narrations_total", "path" => path.to_string()).increment(1);
}

/// Record the outcome of one batch item.
pub fn record_batch_item(success: bool) {
    counter!("batch_items_total", "success" => success.to_string()).increment(1);
}
