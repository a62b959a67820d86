//! In-process workflow store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{
    ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError, WorkflowRunId,
};

use crate::complexity::ComplexityLevel;
use crate::ports::WorkflowStore;
use crate::run::{StageTransition, WorkflowRun};
use crate::step::StepRecord;

#[derive(Debug, Clone)]
struct StoredRun {
    claim_id: ClaimId,
    created_at: DateTime<Utc>,
    complexity: Option<ComplexityLevel>,
    history: Vec<StageTransition>,
    steps: Vec<StepRecord>,
}

/// WorkflowStore kept in a map behind a tokio `RwLock`
///
/// Cloning shares the underlying map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWorkflowStore {
    runs: Arc<RwLock<HashMap<WorkflowRunId, StoredRun>>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored runs
    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

impl DomainPort for InMemoryWorkflowStore {}

#[async_trait]
impl HealthCheckable for InMemoryWorkflowStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("in-memory-workflow-store")
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn create_run(&self, run: &WorkflowRun) -> Result<(), PortError> {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&run.id()) {
            return Err(PortError::conflict(format!("run {} already exists", run.id())));
        }
        runs.insert(
            run.id(),
            StoredRun {
                claim_id: run.claim_id(),
                created_at: run.created_at(),
                complexity: run.complexity(),
                history: run.history().to_vec(),
                steps: run.steps().to_vec(),
            },
        );
        Ok(())
    }

    async fn record_complexity(
        &self,
        run_id: WorkflowRunId,
        level: ComplexityLevel,
    ) -> Result<(), PortError> {
        let mut runs = self.runs.write().await;
        let stored = runs
            .get_mut(&run_id)
            .ok_or_else(|| PortError::not_found("WorkflowRun", run_id))?;
        stored.complexity = Some(level);
        Ok(())
    }

    async fn append_step_record(&self, record: &StepRecord) -> Result<(), PortError> {
        let mut runs = self.runs.write().await;
        let stored = runs
            .get_mut(&record.run_id)
            .ok_or_else(|| PortError::not_found("WorkflowRun", record.run_id))?;

        if stored.steps.iter().any(|s| s.id == record.id) {
            return Ok(());
        }
        if stored.steps.iter().any(|s| s.producer == record.producer) {
            return Err(PortError::conflict(format!(
                "run {} already has a {} record",
                record.run_id, record.producer
            )));
        }
        stored.steps.push(record.clone());
        Ok(())
    }

    async fn update_run_stage(
        &self,
        run_id: WorkflowRunId,
        transition: &StageTransition,
    ) -> Result<(), PortError> {
        let mut runs = self.runs.write().await;
        let stored = runs
            .get_mut(&run_id)
            .ok_or_else(|| PortError::not_found("WorkflowRun", run_id))?;

        let current = stored.history.last().map(|t| t.stage);
        if let Some(current) = current {
            if !current.can_transition_to(transition.stage) {
                return Err(PortError::validation(format!(
                    "run {run_id} cannot move from {current} to {}",
                    transition.stage
                )));
            }
        }
        stored.history.push(transition.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: WorkflowRunId) -> Result<WorkflowRun, PortError> {
        let runs = self.runs.read().await;
        let stored = runs
            .get(&run_id)
            .ok_or_else(|| PortError::not_found("WorkflowRun", run_id))?;
        Ok(WorkflowRun::restore(
            run_id,
            stored.claim_id,
            stored.created_at,
            stored.complexity,
            stored.history.clone(),
            stored.steps.clone(),
        ))
    }
}
