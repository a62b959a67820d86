//! Audit log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use core_kernel::{StepRecordId, WorkflowRunId};
use crate::analysis::StructuredAnalysisResult;

/// Output of one producer within one run
///
/// Records are write-once; the run only ever appends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: StepRecordId,
    pub run_id: WorkflowRunId,
    pub producer: String,
    pub decision: String,
    pub confidence: f64,
    pub rationale: String,
    pub recorded_at: DateTime<Utc>,
    pub payload: Value,
}

impl StepRecord {
    /// Builds the audit record for a structured result
    pub fn from_result(
        run_id: WorkflowRunId,
        producer: impl Into<String>,
        result: &StructuredAnalysisResult,
    ) -> Self {
        Self {
            id: StepRecordId::new_v7(),
            run_id,
            producer: producer.into(),
            decision: result.decision_label(),
            confidence: result.confidence(),
            rationale: result.rationale().to_string(),
            recorded_at: Utc::now(),
            payload: serde_json::to_value(result).unwrap_or(Value::Null),
        }
    }

    /// Decodes the payload back into the structured result
    pub fn result(&self) -> Option<StructuredAnalysisResult> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}
