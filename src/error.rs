//! Error types for the analyzer.
//!
//! Decoding, scoring, and narration never surface these to callers; they are
//! absorbed by the fallback branches. They show up in batch item slots and
//! when loading template files.

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid address '{0}': expected 0x followed by 40 hex characters")]
    InvalidAddress(String),

    #[error("invalid calldata: {0}")]
    InvalidCalldata(String),

    #[error("invalid value '{value}': {cause}")]
    InvalidValue { value: String, cause: String },

    #[error("batch must contain at least one transaction")]
    EmptyBatch,

    #[error("batch of {size} transactions exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("analysis aborted: {0}")]
    Panicked(String),
}

/// Failures reported by an injected template store.
#[derive(Debug, thiserror::Error)]
pub enum TemplateStoreError {
    #[error("template store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("template store unavailable: {0}")]
    Unavailable(String),
}

impl AnalysisError {
    /// Build a `Panicked` error from a caught unwind payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        AnalysisError::Panicked(panic_message(payload.as_ref()))
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
