//! Workflow engine
//!
//! Drives one claim through the run state machine. Every transition is
//! applied to the in-memory [`WorkflowRun`] first and then mirrored to the
//! [`WorkflowStore`]. Errors after intake fail the run with a readable reason
//! and keep every step record written so far. The engine never retries; a
//! retry is a new run.
//!
//! Cancellation and the run deadline only interrupt the non-terminal part of
//! a run. The terminal transition is applied once the outcome is known and
//! is always written to the store, so a returned run and its outcome agree.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use core_kernel::WorkflowRunId;

use crate::analysis::{CommunicationDraft, StructuredAnalysisResult, SynthesisResult};
use crate::claim::ClaimSubmission;
use crate::complexity::ComplexityClassifier;
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::escalation::EscalationGate;
use crate::gaps::{GapAnalyzer, MissingItem};
use crate::ports::{AnalysisClient, WorkflowStore};
use crate::run::{StageTransition, WorkflowRun, WorkflowStage, SYNTHESIS_PRODUCER};
use crate::step::StepRecord;

use super::prompts;
use super::remediation::{RemediationStage, COMMUNICATION_PRODUCER};
use super::specialists::{SpecialistCoordinator, SpecialistTask};
use super::synthesis::Synthesizer;
use super::triage::ComplexityTriage;

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Completed {
        synthesis: SynthesisResult,
        communication: Option<CommunicationDraft>,
        missing_items: Vec<MissingItem>,
    },
    Escalated {
        triggers: Vec<String>,
    },
    Failed {
        reason: String,
    },
}

/// Terminal run plus its outcome
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub run: WorkflowRun,
    pub outcome: WorkflowOutcome,
    /// False when the terminal transition could not be written; the stored
    /// run then still shows its last non-terminal stage
    pub persisted: bool,
}

impl WorkflowResult {
    pub fn stage(&self) -> WorkflowStage {
        self.run.stage()
    }
}

/// A run executing on the tokio runtime
#[derive(Debug)]
pub struct RunHandle {
    run_id: WorkflowRunId,
    cancel: watch::Sender<bool>,
    task: JoinHandle<WorkflowResult>,
}

impl RunHandle {
    pub fn run_id(&self) -> WorkflowRunId {
        self.run_id
    }

    /// Requests cancellation
    ///
    /// The in-flight stage is dropped, including every pending specialist
    /// call, and the run fails with a cancellation reason.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Waits for the run to reach a terminal stage
    pub async fn join(self) -> Result<WorkflowResult, WorkflowError> {
        self.task
            .await
            .map_err(|e| WorkflowError::Internal(format!("run task aborted: {e}")))
    }
}

/// Claims evaluation workflow engine
pub struct WorkflowEngine {
    config: WorkflowConfig,
    store: Arc<dyn WorkflowStore>,
    triage: ComplexityTriage,
    gate: EscalationGate,
    gaps: GapAnalyzer,
    coordinator: SpecialistCoordinator,
    remediation: RemediationStage,
    synthesizer: Synthesizer,
}

impl WorkflowEngine {
    pub fn new(
        config: WorkflowConfig,
        client: Arc<dyn AnalysisClient>,
        store: Arc<dyn WorkflowStore>,
    ) -> Self {
        let call_timeout = config.timeouts.analysis_call();
        Self {
            triage: ComplexityTriage::new(
                ComplexityClassifier::new(config.complexity.clone()),
                Arc::clone(&client),
                call_timeout,
                config.enhanced_complexity,
            ),
            gate: EscalationGate::new(config.escalation.clone()),
            gaps: GapAnalyzer::new(),
            coordinator: SpecialistCoordinator::new(Arc::clone(&client), call_timeout),
            remediation: RemediationStage::new(Arc::clone(&client), call_timeout),
            synthesizer: Synthesizer::new(client, call_timeout),
            store,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Runs a claim to a terminal stage
    ///
    /// Returns an error only when the run could not be created in the store;
    /// every later failure is reported as a FAILED run.
    pub async fn execute(&self, claim: ClaimSubmission) -> Result<WorkflowResult, WorkflowError> {
        let (_cancel, signal) = watch::channel(false);
        self.execute_with_cancel(claim, signal).await
    }

    /// Like [`execute`](Self::execute), stopping early once `signal` is true
    pub async fn execute_with_cancel(
        &self,
        claim: ClaimSubmission,
        signal: watch::Receiver<bool>,
    ) -> Result<WorkflowResult, WorkflowError> {
        let run = self.open_run(&claim).await?;
        Ok(self.run_to_end(run, claim, signal).await)
    }

    /// Persists a new run and executes it on a spawned task
    pub async fn start_run(
        self: &Arc<Self>,
        claim: ClaimSubmission,
    ) -> Result<RunHandle, WorkflowError> {
        let run = self.open_run(&claim).await?;
        let run_id = run.id();
        let (cancel, signal) = watch::channel(false);
        let engine = Arc::clone(self);
        let task = tokio::spawn(async move { engine.run_to_end(run, claim, signal).await });
        Ok(RunHandle {
            run_id,
            cancel,
            task,
        })
    }

    /// Current persisted state of a run
    pub async fn get_run_status(&self, run_id: WorkflowRunId) -> Result<WorkflowRun, WorkflowError> {
        Ok(self.store.get_run(run_id).await?)
    }

    async fn open_run(&self, claim: &ClaimSubmission) -> Result<WorkflowRun, WorkflowError> {
        let run = WorkflowRun::new(claim.id);
        self.store.create_run(&run).await?;
        info!(run_id = %run.id(), claim_id = %claim.id, "Workflow run started");
        Ok(run)
    }

    #[instrument(skip_all, fields(run_id = %run.id(), claim_id = %claim.id))]
    async fn run_to_end(
        &self,
        mut run: WorkflowRun,
        claim: ClaimSubmission,
        signal: watch::Receiver<bool>,
    ) -> WorkflowResult {
        let deadline = self.config.timeouts.run_deadline();
        let result = tokio::select! {
            biased;
            _ = cancelled(signal) => Err(WorkflowError::Cancelled),
            driven = tokio::time::timeout(deadline, self.drive(&mut run, &claim)) => {
                driven.unwrap_or_else(|_| {
                    Err(WorkflowError::Timeout {
                        scope: "run deadline",
                        after_ms: self.config.timeouts.run_deadline_ms,
                    })
                })
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                let reason = error.to_string();
                warn!(stage = %run.stage(), reason = %reason, "Workflow run failed");
                WorkflowOutcome::Failed { reason }
            }
        };
        let (outcome, persisted) = self.finish(&mut run, outcome).await;
        info!(
            stage = %run.stage(),
            steps = run.steps().len(),
            persisted,
            "Workflow run finished"
        );
        WorkflowResult {
            run,
            outcome,
            persisted,
        }
    }

    /// Applies the terminal transition matching `outcome` and mirrors it
    async fn finish(
        &self,
        run: &mut WorkflowRun,
        outcome: WorkflowOutcome,
    ) -> (WorkflowOutcome, bool) {
        let applied = match &outcome {
            WorkflowOutcome::Completed { .. } => run.complete(),
            WorkflowOutcome::Escalated { triggers } => run.escalate(triggers.clone()),
            WorkflowOutcome::Failed { reason } => run.fail(reason.clone()),
        };
        let (outcome, applied) = match applied {
            Ok(transition) => (outcome, Ok(transition)),
            Err(e) => {
                let reason = e.to_string();
                error!(error = %e, "Terminal transition rejected, failing run");
                let applied = run.fail(reason.clone());
                (WorkflowOutcome::Failed { reason }, applied)
            }
        };
        match applied {
            Ok(transition) => {
                let persisted = self.persist_terminal(run, &transition).await;
                (outcome, persisted)
            }
            Err(e) => {
                error!(error = %e, "Could not mark run as failed");
                (outcome, false)
            }
        }
    }

    async fn drive(
        &self,
        run: &mut WorkflowRun,
        claim: &ClaimSubmission,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let run_id = run.id();
        claim.validate_for_intake(Utc::now())?;
        let brief = prompts::claim_transcript(claim);

        let complexity = self.triage.classify(claim, &brief).await;
        run.set_complexity(complexity.level)?;
        self.store
            .record_complexity(run_id, complexity.level)
            .await?;

        let stage = if claim.has_images() {
            WorkflowStage::ImageProcessing
        } else {
            WorkflowStage::Assessment
        };
        let transition = run.advance_with_note(stage, complexity.note())?;
        self.persist(run, &transition).await?;

        let bundle = self
            .coordinator
            .run_specialists(SpecialistTask::for_claim(claim), &brief)
            .await?;
        for (task, result) in bundle.structured_results() {
            self.record(run, StepRecord::from_result(run_id, task.name(), result))
                .await?;
        }

        let images = bundle.image_summary();
        let decision = if claim.has_images() {
            self.gate
                .evaluate_image_aware(claim, run.steps(), images.as_ref())
        } else {
            self.gate.evaluate(claim, run.steps(), images.as_ref())
        };
        if decision.escalate() {
            let triggers = decision.descriptions();
            warn!(triggers = ?triggers, "Escalating to human review");
            return Ok(WorkflowOutcome::Escalated { triggers });
        }

        let transition = run.advance(WorkflowStage::Communication)?;
        self.persist(run, &transition).await?;

        let missing_items = self.gaps.derive_missing_items(
            bundle.structured_results().map(|(_, result)| result),
            claim.loss_type,
        );
        let (transcript, communication) = self
            .remediation
            .maybe_draft_communication(bundle.merged_transcript, &missing_items)
            .await?
            .into_parts();
        if let Some(draft) = &communication {
            let result = StructuredAnalysisResult::Communication(draft.clone());
            self.record(
                run,
                StepRecord::from_result(run_id, COMMUNICATION_PRODUCER, &result),
            )
            .await?;
        }

        let synthesis = self.synthesizer.synthesize(transcript).await?;
        let result = StructuredAnalysisResult::Synthesis(synthesis.clone());
        self.record(run, StepRecord::from_result(run_id, SYNTHESIS_PRODUCER, &result))
            .await?;

        Ok(WorkflowOutcome::Completed {
            synthesis,
            communication,
            missing_items,
        })
    }

    async fn record(&self, run: &mut WorkflowRun, record: StepRecord) -> Result<(), WorkflowError> {
        run.record_step(record.clone())?;
        self.store.append_step_record(&record).await?;
        Ok(())
    }

    async fn persist(
        &self,
        run: &WorkflowRun,
        transition: &StageTransition,
    ) -> Result<(), WorkflowError> {
        self.store.update_run_stage(run.id(), transition).await?;
        info!(stage = %transition.stage, "Stage transition");
        Ok(())
    }

    /// Mirrors a terminal transition; the run is already final in memory, so
    /// a store failure is logged and reported as `false`
    async fn persist_terminal(&self, run: &WorkflowRun, transition: &StageTransition) -> bool {
        match self.persist(run, transition).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    stage = %transition.stage,
                    error = %e,
                    "Failed to persist terminal transition"
                );
                false
            }
        }
    }
}

/// Resolves once the flag turns true; never resolves if the sender is gone
async fn cancelled(mut signal: watch::Receiver<bool>) {
    loop {
        if *signal.borrow_and_update() {
            return;
        }
        if signal.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
