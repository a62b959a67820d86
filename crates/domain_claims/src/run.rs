//! Workflow run aggregate
//!
//! A run moves forward through its stages and ends in exactly one terminal
//! state:
//!
//! ```text
//! INTAKE -> ASSESSMENT | IMAGE_PROCESSING -> HUMAN_REVIEW
//!                                         -> COMMUNICATION -> COMPLETED
//! (any non-terminal stage) -> FAILED
//! ```
//!
//! All mutation goes through the transition methods on [`WorkflowRun`]; each
//! one appends exactly one [`StageTransition`] that the engine mirrors to the
//! store. Once terminal, every mutator returns [`WorkflowError::RunTerminal`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClaimId, WorkflowRunId};
use crate::complexity::ComplexityLevel;
use crate::error::WorkflowError;
use crate::step::StepRecord;

/// Producer name of the final synthesis record
pub const SYNTHESIS_PRODUCER: &str = "synthesis";

/// Workflow stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    Intake,
    Assessment,
    ImageProcessing,
    Communication,
    HumanReview,
    Completed,
    Failed,
}

impl WorkflowStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStage::HumanReview | WorkflowStage::Completed | WorkflowStage::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Intake => "INTAKE",
            WorkflowStage::Assessment => "ASSESSMENT",
            WorkflowStage::ImageProcessing => "IMAGE_PROCESSING",
            WorkflowStage::Communication => "COMMUNICATION",
            WorkflowStage::HumanReview => "HUMAN_REVIEW",
            WorkflowStage::Completed => "COMPLETED",
            WorkflowStage::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INTAKE" => Some(WorkflowStage::Intake),
            "ASSESSMENT" => Some(WorkflowStage::Assessment),
            "IMAGE_PROCESSING" => Some(WorkflowStage::ImageProcessing),
            "COMMUNICATION" => Some(WorkflowStage::Communication),
            "HUMAN_REVIEW" => Some(WorkflowStage::HumanReview),
            "COMPLETED" => Some(WorkflowStage::Completed),
            "FAILED" => Some(WorkflowStage::Failed),
            _ => None,
        }
    }

    /// Checks if a move from `self` to `target` is allowed
    pub fn can_transition_to(&self, target: WorkflowStage) -> bool {
        use WorkflowStage::*;
        matches!(
            (*self, target),
            (Intake, Assessment)
                | (Intake, ImageProcessing)
                | (Assessment, HumanReview)
                | (Assessment, Communication)
                | (ImageProcessing, HumanReview)
                | (ImageProcessing, Communication)
                | (Communication, Completed)
        ) || (!self.is_terminal() && target == Failed)
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage change, as written to the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub stage: WorkflowStage,
    pub at: DateTime<Utc>,
    /// Failure reason for FAILED, free-form otherwise
    pub note: Option<String>,
    /// Escalation conditions for HUMAN_REVIEW
    #[serde(default)]
    pub triggers: Vec<String>,
}

impl StageTransition {
    fn new(stage: WorkflowStage) -> Self {
        Self {
            stage,
            at: Utc::now(),
            note: None,
            triggers: Vec::new(),
        }
    }
}

/// One end-to-end processing attempt for a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    id: WorkflowRunId,
    claim_id: ClaimId,
    stage: WorkflowStage,
    complexity: Option<ComplexityLevel>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    steps: Vec<StepRecord>,
    history: Vec<StageTransition>,
    escalation_triggers: Vec<String>,
    failure_reason: Option<String>,
}

impl WorkflowRun {
    /// Creates a run in INTAKE
    pub fn new(claim_id: ClaimId) -> Self {
        let intake = StageTransition::new(WorkflowStage::Intake);
        Self {
            id: WorkflowRunId::new_v7(),
            claim_id,
            stage: WorkflowStage::Intake,
            complexity: None,
            created_at: intake.at,
            updated_at: intake.at,
            steps: Vec::new(),
            history: vec![intake],
            escalation_triggers: Vec::new(),
            failure_reason: None,
        }
    }

    /// Rebuilds a run from its persisted audit log
    ///
    /// The current stage, failure reason and escalation triggers are derived
    /// from the last transition, so the log is the single source of truth.
    pub fn restore(
        id: WorkflowRunId,
        claim_id: ClaimId,
        created_at: DateTime<Utc>,
        complexity: Option<ComplexityLevel>,
        history: Vec<StageTransition>,
        steps: Vec<StepRecord>,
    ) -> Self {
        let last = history.last();
        let stage = last.map(|t| t.stage).unwrap_or(WorkflowStage::Intake);
        let updated_at = history
            .iter()
            .map(|t| t.at)
            .chain(steps.iter().map(|s| s.recorded_at))
            .fold(created_at, |latest, at| latest.max(at));
        let failure_reason = last
            .filter(|t| t.stage == WorkflowStage::Failed)
            .and_then(|t| t.note.clone());
        let escalation_triggers = last
            .filter(|t| t.stage == WorkflowStage::HumanReview)
            .map(|t| t.triggers.clone())
            .unwrap_or_default();

        Self {
            id,
            claim_id,
            stage,
            complexity,
            created_at,
            updated_at,
            steps,
            history,
            escalation_triggers,
            failure_reason,
        }
    }

    pub fn id(&self) -> WorkflowRunId {
        self.id
    }

    pub fn claim_id(&self) -> ClaimId {
        self.claim_id
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn complexity(&self) -> Option<ComplexityLevel> {
        self.complexity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn history(&self) -> &[StageTransition] {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn is_escalated(&self) -> bool {
        self.stage == WorkflowStage::HumanReview
    }

    pub fn escalation_triggers(&self) -> &[String] {
        &self.escalation_triggers
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Finds the record written by a producer
    pub fn step_for(&self, producer: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.producer == producer)
    }

    /// Records the complexity classification
    pub fn set_complexity(&mut self, level: ComplexityLevel) -> Result<(), WorkflowError> {
        self.ensure_active()?;
        self.complexity = Some(level);
        Ok(())
    }

    /// Moves to a non-terminal stage
    pub fn advance(&mut self, target: WorkflowStage) -> Result<StageTransition, WorkflowError> {
        if target.is_terminal() {
            return Err(self.invalid(target));
        }
        self.apply(StageTransition::new(target))
    }

    /// Moves to a non-terminal stage, attaching an audit note
    pub fn advance_with_note(
        &mut self,
        target: WorkflowStage,
        note: impl Into<String>,
    ) -> Result<StageTransition, WorkflowError> {
        if target.is_terminal() {
            return Err(self.invalid(target));
        }
        let mut transition = StageTransition::new(target);
        transition.note = Some(note.into());
        self.apply(transition)
    }

    /// Appends a step record
    ///
    /// Each producer may write at most one record per run, and nothing may be
    /// appended after the synthesis record.
    pub fn record_step(&mut self, record: StepRecord) -> Result<(), WorkflowError> {
        self.ensure_active()?;
        if record.run_id != self.id {
            return Err(WorkflowError::Internal(format!(
                "step record for run {} offered to run {}",
                record.run_id, self.id
            )));
        }
        if self.step_for(SYNTHESIS_PRODUCER).is_some()
            || self.step_for(&record.producer).is_some()
        {
            return Err(WorkflowError::DuplicateStep(record.producer));
        }
        self.updated_at = self.updated_at.max(record.recorded_at);
        self.steps.push(record);
        Ok(())
    }

    /// Routes the run to a human reviewer
    pub fn escalate(&mut self, triggers: Vec<String>) -> Result<StageTransition, WorkflowError> {
        let mut transition = StageTransition::new(WorkflowStage::HumanReview);
        transition.triggers = triggers;
        self.apply(transition)
    }

    /// Finishes the run; requires the synthesis record to be the last step
    pub fn complete(&mut self) -> Result<StageTransition, WorkflowError> {
        let synthesized = self
            .steps
            .last()
            .map(|s| s.producer == SYNTHESIS_PRODUCER)
            .unwrap_or(false);
        if !synthesized {
            return Err(self.invalid(WorkflowStage::Completed));
        }
        self.apply(StageTransition::new(WorkflowStage::Completed))
    }

    /// Fails the run, keeping every record produced so far
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<StageTransition, WorkflowError> {
        let mut transition = StageTransition::new(WorkflowStage::Failed);
        transition.note = Some(reason.into());
        self.apply(transition)
    }

    fn apply(&mut self, transition: StageTransition) -> Result<StageTransition, WorkflowError> {
        self.ensure_active()?;
        if !self.stage.can_transition_to(transition.stage) {
            return Err(self.invalid(transition.stage));
        }

        self.stage = transition.stage;
        self.updated_at = self.updated_at.max(transition.at);
        match transition.stage {
            WorkflowStage::Failed => self.failure_reason = transition.note.clone(),
            WorkflowStage::HumanReview => self.escalation_triggers = transition.triggers.clone(),
            _ => {}
        }
        self.history.push(transition.clone());
        Ok(transition)
    }

    fn ensure_active(&self) -> Result<(), WorkflowError> {
        if self.is_terminal() {
            return Err(WorkflowError::RunTerminal(self.id.to_string()));
        }
        Ok(())
    }

    fn invalid(&self, target: WorkflowStage) -> WorkflowError {
        WorkflowError::InvalidTransition {
            from: self.stage.to_string(),
            to: target.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        ConfidenceTier, Recommendation, StructuredAnalysisResult, SynthesisResult,
    };
    use serde_json::json;

    fn record(run: &WorkflowRun, producer: &str) -> StepRecord {
        StepRecord {
            id: core_kernel::StepRecordId::new(),
            run_id: run.id(),
            producer: producer.to_string(),
            decision: "VALID".to_string(),
            confidence: 0.9,
            rationale: "ok".to_string(),
            recorded_at: Utc::now(),
            payload: json!({}),
        }
    }

    fn synthesis(run: &WorkflowRun) -> StepRecord {
        StepRecord::from_result(
            run.id(),
            SYNTHESIS_PRODUCER,
            &StructuredAnalysisResult::Synthesis(SynthesisResult {
                recommendation: Recommendation::Approve,
                confidence: ConfidenceTier::High,
                summary: "All checks consistent".into(),
                key_findings: vec![],
                next_steps: vec![],
            }),
        )
    }

    #[test]
    fn test_new_run_starts_in_intake() {
        let run = WorkflowRun::new(ClaimId::new());
        assert_eq!(run.stage(), WorkflowStage::Intake);
        assert_eq!(run.history().len(), 1);
        assert!(run.steps().is_empty());
        assert!(!run.is_terminal());
    }

    #[test]
    fn test_happy_path() {
        let mut run = WorkflowRun::new(ClaimId::new());
        run.advance(WorkflowStage::Assessment).unwrap();
        run.record_step(record(&run, "assessment")).unwrap();
        run.advance(WorkflowStage::Communication).unwrap();
        run.record_step(synthesis(&run)).unwrap();
        run.complete().unwrap();

        assert_eq!(run.stage(), WorkflowStage::Completed);
        assert!(run.is_terminal());
        let stages: Vec<_> = run.history().iter().map(|t| t.stage).collect();
        assert_eq!(
            stages,
            vec![
                WorkflowStage::Intake,
                WorkflowStage::Assessment,
                WorkflowStage::Communication,
                WorkflowStage::Completed
            ]
        );
    }

    #[test]
    fn test_no_backward_or_sideways_moves() {
        let mut run = WorkflowRun::new(ClaimId::new());
        run.advance(WorkflowStage::ImageProcessing).unwrap();
        assert!(run.advance(WorkflowStage::Assessment).is_err());
        assert!(run.advance(WorkflowStage::Intake).is_err());
        run.advance(WorkflowStage::Communication).unwrap();
        assert!(run.advance(WorkflowStage::ImageProcessing).is_err());
    }

    #[test]
    fn test_terminal_stages_need_dedicated_methods() {
        let mut run = WorkflowRun::new(ClaimId::new());
        run.advance(WorkflowStage::Assessment).unwrap();
        assert!(run.advance(WorkflowStage::HumanReview).is_err());
        assert!(run.advance(WorkflowStage::Failed).is_err());
    }

    #[test]
    fn test_complete_requires_synthesis_last() {
        let mut run = WorkflowRun::new(ClaimId::new());
        run.advance(WorkflowStage::Assessment).unwrap();
        run.advance(WorkflowStage::Communication).unwrap();
        assert!(matches!(
            run.complete(),
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_escalation_only_after_specialists() {
        let mut run = WorkflowRun::new(ClaimId::new());
        assert!(run.escalate(vec!["amount".into()]).is_err());
        run.advance(WorkflowStage::Assessment).unwrap();
        run.escalate(vec!["amount above 50000".into()]).unwrap();
        assert!(run.is_escalated());
        assert_eq!(run.escalation_triggers(), &["amount above 50000".to_string()]);
    }

    #[test]
    fn test_terminal_run_is_immutable() {
        let mut run = WorkflowRun::new(ClaimId::new());
        run.fail("intake validation failed").unwrap();
        let extra = record(&run, "assessment");

        assert!(matches!(run.record_step(extra), Err(WorkflowError::RunTerminal(_))));
        assert!(matches!(run.fail("again"), Err(WorkflowError::RunTerminal(_))));
        assert!(matches!(
            run.set_complexity(ComplexityLevel::Low),
            Err(WorkflowError::RunTerminal(_))
        ));
        assert_eq!(run.failure_reason(), Some("intake validation failed"));
    }

    #[test]
    fn test_failure_keeps_records() {
        let mut run = WorkflowRun::new(ClaimId::new());
        run.advance(WorkflowStage::Assessment).unwrap();
        run.record_step(record(&run, "risk")).unwrap();
        run.fail("timeout: run deadline exceeded 10ms").unwrap();
        assert_eq!(run.steps().len(), 1);
        assert_eq!(run.stage(), WorkflowStage::Failed);
    }

    #[test]
    fn test_one_record_per_producer() {
        let mut run = WorkflowRun::new(ClaimId::new());
        run.advance(WorkflowStage::Assessment).unwrap();
        run.record_step(record(&run, "coverage")).unwrap();
        let dup = record(&run, "coverage");
        assert!(matches!(run.record_step(dup), Err(WorkflowError::DuplicateStep(p)) if p == "coverage"));
    }

    #[test]
    fn test_nothing_after_synthesis() {
        let mut run = WorkflowRun::new(ClaimId::new());
        run.advance(WorkflowStage::Assessment).unwrap();
        run.advance(WorkflowStage::Communication).unwrap();
        run.record_step(synthesis(&run)).unwrap();
        assert!(run.record_step(record(&run, "communication")).is_err());
    }

    #[test]
    fn test_foreign_record_rejected() {
        let mut run = WorkflowRun::new(ClaimId::new());
        let other = WorkflowRun::new(ClaimId::new());
        assert!(run.record_step(record(&other, "risk")).is_err());
    }

    #[test]
    fn test_restore_derives_state_from_history() {
        let mut run = WorkflowRun::new(ClaimId::new());
        run.set_complexity(ComplexityLevel::High).unwrap();
        run.advance(WorkflowStage::Assessment).unwrap();
        run.record_step(record(&run, "assessment")).unwrap();
        run.escalate(vec!["confidence 0.4 below 0.7".into()]).unwrap();

        let restored = WorkflowRun::restore(
            run.id(),
            run.claim_id(),
            run.created_at(),
            run.complexity(),
            run.history().to_vec(),
            run.steps().to_vec(),
        );
        assert_eq!(restored, run);
    }

    #[test]
    fn test_stage_round_trips_through_text() {
        for stage in [
            WorkflowStage::Intake,
            WorkflowStage::ImageProcessing,
            WorkflowStage::HumanReview,
            WorkflowStage::Failed,
        ] {
            assert_eq!(WorkflowStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(WorkflowStage::parse("DONE"), None);
    }
}
