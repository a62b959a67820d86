//! Claims workflow errors

use thiserror::Error;

use core_kernel::PortError;

/// A structural problem with a claim detected at intake
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Failures reported by the reasoning capability
///
/// The engine never retries these; a caller may start a new run when
/// [`AnalysisError::is_transient`] is true.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("timeout after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("empty response from analysis service")]
    EmptyResponse,
}

impl AnalysisError {
    /// Timeouts and transport failures may succeed on a fresh attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, AnalysisError::Timeout { .. } | AnalysisError::Transport(_))
    }
}

/// Errors that end or reject a workflow run
///
/// The `Display` text of the variant that fails a run becomes its
/// human-readable failure reason.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("intake validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{stage} failed: {source}")]
    Analysis {
        stage: &'static str,
        #[source]
        source: AnalysisError,
    },

    #[error("all specialist analyses failed: {0}")]
    Aggregation(String),

    #[error("synthesis rejected: {0}")]
    Synthesis(String),

    #[error("invalid stage transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("duplicate step record for producer {0}")]
    DuplicateStep(String),

    #[error("run {0} is already terminal")]
    RunTerminal(String),

    #[error("timeout: {scope} exceeded {after_ms}ms")]
    Timeout { scope: &'static str, after_ms: u64 },

    #[error("cancelled by caller")]
    Cancelled,

    #[error("persistence failure: {0}")]
    Persistence(#[from] PortError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    pub fn analysis(stage: &'static str, source: AnalysisError) -> Self {
        WorkflowError::Analysis { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_reason_is_descriptive() {
        let err: WorkflowError =
            ValidationError::new("incident.date", "'03/15/2024' is not an ISO date").into();
        let reason = err.to_string();
        assert!(reason.contains("incident.date"));
        assert!(reason.contains("03/15/2024"));
    }

    #[test]
    fn test_analysis_timeout_mentions_timeout() {
        let err = WorkflowError::analysis("synthesis", AnalysisError::Timeout { after_ms: 500 });
        assert_eq!(err.to_string(), "synthesis failed: timeout after 500ms");
    }

    #[test]
    fn test_transient_classification() {
        assert!(AnalysisError::Timeout { after_ms: 1 }.is_transient());
        assert!(AnalysisError::Transport("reset".into()).is_transient());
        assert!(!AnalysisError::SchemaValidation("bad".into()).is_transient());
        assert!(!AnalysisError::EmptyResponse.is_transient());
    }
}
