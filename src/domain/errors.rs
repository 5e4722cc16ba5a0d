use thiserror::Error;

/// Errors raised while validating a group's filter criteria.
///
/// These are recoverable: the group carrying them is skipped and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Criteria text is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("Criteria must be a JSON object, got {found}")]
    NotAnObject { found: String },

    #[error("Invalid value for criteria field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Errors raised while reconciling computed trend rows with the store
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "Full replace refused: batch is missing {} previously stored group(s): {}",
        missing_groups.len(),
        missing_groups.join(", ")
    )]
    PartialBatch { missing_groups: Vec<String> },

    #[error("Trend store operation failed: {reason}")]
    Store { reason: String },
}

/// Run-level failures. Any of these aborts the run before output is written.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load {collection}: {reason}")]
    LoadFailed {
        collection: &'static str,
        reason: String,
    },

    #[error("Required collection '{collection}' is empty, nothing to compute")]
    EmptyInput { collection: &'static str },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}
