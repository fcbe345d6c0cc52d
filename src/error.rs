//! Error types for the analysis pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by dataset loading and statistics computation.
///
/// Per-fight failures during batch classification are logged and skipped by
/// the analyzer; these variants describe the failures that abort an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("artifact not found: {path}")]
    NotFound { path: PathBuf },

    #[error("no usable fights in dataset {dataset}")]
    EmptyDataset { dataset: String },

    #[error("need at least 2 samples for a confidence interval, got {count}")]
    InsufficientSample { count: usize },

    #[error("malformed record in {path}: {detail}")]
    Schema { path: PathBuf, detail: String },
}
