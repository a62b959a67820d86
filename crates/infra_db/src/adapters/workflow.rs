//! PostgreSQL Workflow Store
//!
//! Implements the `WorkflowStore` port on top of [`WorkflowRepository`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool_from_url, run_migrations, PostgresWorkflowStore};
//! use domain_claims::{WorkflowEngine, WorkflowStore};
//! use std::sync::Arc;
//!
//! let pool = create_pool_from_url("postgres://localhost/claims_workflow").await?;
//! run_migrations(&pool).await?;
//! let store: Arc<dyn WorkflowStore> = Arc::new(PostgresWorkflowStore::new(pool));
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError,
    StepRecordId, WorkflowRunId,
};
use domain_claims::{
    ComplexityLevel, StageTransition, StepRecord, WorkflowRun, WorkflowStage, WorkflowStore,
};

use crate::error::DatabaseError;
use crate::repositories::{StageTransitionRow, StepRecordRow, WorkflowRepository, WorkflowRunRow};

const ADAPTER_ID: &str = "postgres-workflow-store";

/// PostgreSQL-backed implementation of the `WorkflowStore` port
///
/// Database errors are translated to `PortError` variants:
/// - missing run -> `PortError::NotFound`
/// - duplicate producer or run id -> `PortError::Conflict`
/// - rejected stage change -> `PortError::Validation`
#[derive(Debug, Clone)]
pub struct PostgresWorkflowStore {
    repository: WorkflowRepository,
}

impl PostgresWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: WorkflowRepository::new(pool),
        }
    }

    pub fn repository(&self) -> &WorkflowRepository {
        &self.repository
    }
}

impl DomainPort for PostgresWorkflowStore {}

#[async_trait]
impl HealthCheckable for PostgresWorkflowStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = self.repository.ping().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(()) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };
        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl WorkflowStore for PostgresWorkflowStore {
    #[instrument(skip(self, run), fields(run_id = %run.id()))]
    async fn create_run(&self, run: &WorkflowRun) -> Result<(), PortError> {
        let transitions: Vec<_> = run
            .history()
            .iter()
            .map(|t| transition_to_row(run.id(), t))
            .collect();
        let steps: Vec<_> = run.steps().iter().map(step_to_row).collect();

        self.repository
            .insert_run(&run_to_row(run), &transitions, &steps)
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateEntry(_) => {
                    PortError::conflict(format!("run {} already exists", run.id()))
                }
                other => other.into(),
            })?;
        debug!("Workflow run created");
        Ok(())
    }

    #[instrument(skip(self), fields(run_id = %run_id, complexity = level.as_str()))]
    async fn record_complexity(
        &self,
        run_id: WorkflowRunId,
        level: ComplexityLevel,
    ) -> Result<(), PortError> {
        self.repository
            .set_complexity(*run_id.as_uuid(), level.as_str())
            .await
            .map_err(|e| missing_run(e, run_id))
    }

    #[instrument(skip(self, record), fields(run_id = %record.run_id, producer = %record.producer))]
    async fn append_step_record(&self, record: &StepRecord) -> Result<(), PortError> {
        let inserted = self
            .repository
            .append_step(&step_to_row(record))
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateEntry(_) => PortError::conflict(format!(
                    "run {} already has a {} record",
                    record.run_id, record.producer
                )),
                other => missing_run(other, record.run_id),
            })?;

        if !inserted {
            debug!(step_id = %record.id, "Step record already stored");
        }
        Ok(())
    }

    #[instrument(skip(self, transition), fields(run_id = %run_id, stage = %transition.stage))]
    async fn update_run_stage(
        &self,
        run_id: WorkflowRunId,
        transition: &StageTransition,
    ) -> Result<(), PortError> {
        let target = transition.stage;
        self.repository
            .append_transition(&transition_to_row(run_id, transition), |current| {
                WorkflowStage::parse(current)
                    .map(|current| current.can_transition_to(target))
                    .unwrap_or(false)
            })
            .await
            .map_err(|e| missing_run(e, run_id))
    }

    #[instrument(skip(self), fields(run_id = %run_id))]
    async fn get_run(&self, run_id: WorkflowRunId) -> Result<WorkflowRun, PortError> {
        let uuid = *run_id.as_uuid();
        let row = self
            .repository
            .find_run(uuid)
            .await
            .map_err(|e| missing_run(e, run_id))?;
        let transitions = self.repository.transitions(uuid).await?;
        let steps = self.repository.steps(uuid).await?;

        rows_to_run(row, transitions, steps)
    }
}

fn missing_run(error: DatabaseError, run_id: WorkflowRunId) -> PortError {
    match error {
        DatabaseError::NotFound(_) | DatabaseError::ForeignKeyViolation(_) => {
            PortError::not_found("WorkflowRun", run_id)
        }
        other => other.into(),
    }
}

fn run_to_row(run: &WorkflowRun) -> WorkflowRunRow {
    WorkflowRunRow {
        id: *run.id().as_uuid(),
        claim_id: *run.claim_id().as_uuid(),
        stage: run.stage().as_str().to_string(),
        complexity: run.complexity().map(|c| c.as_str().to_string()),
        created_at: run.created_at(),
        updated_at: run.updated_at(),
    }
}

fn transition_to_row(run_id: WorkflowRunId, transition: &StageTransition) -> StageTransitionRow {
    StageTransitionRow {
        run_id: *run_id.as_uuid(),
        stage: transition.stage.as_str().to_string(),
        at: transition.at,
        note: transition.note.clone(),
        triggers: Json(transition.triggers.clone()),
    }
}

fn step_to_row(record: &StepRecord) -> StepRecordRow {
    StepRecordRow {
        id: *record.id.as_uuid(),
        run_id: *record.run_id.as_uuid(),
        producer: record.producer.clone(),
        decision: record.decision.clone(),
        confidence: record.confidence,
        rationale: record.rationale.clone(),
        recorded_at: record.recorded_at,
        payload: record.payload.clone(),
    }
}

fn rows_to_run(
    row: WorkflowRunRow,
    transitions: Vec<StageTransitionRow>,
    steps: Vec<StepRecordRow>,
) -> Result<WorkflowRun, PortError> {
    let complexity = row
        .complexity
        .as_deref()
        .map(|value| {
            ComplexityLevel::parse(value)
                .ok_or_else(|| PortError::transformation(format!("unknown complexity '{value}'")))
        })
        .transpose()?;

    let history = transitions
        .into_iter()
        .map(|t| {
            let stage = WorkflowStage::parse(&t.stage)
                .ok_or_else(|| PortError::transformation(format!("unknown stage '{}'", t.stage)))?;
            Ok(StageTransition {
                stage,
                at: t.at,
                note: t.note,
                triggers: t.triggers.0,
            })
        })
        .collect::<Result<Vec<_>, PortError>>()?;

    let steps = steps
        .into_iter()
        .map(|s| StepRecord {
            id: StepRecordId::from_uuid(s.id),
            run_id: WorkflowRunId::from_uuid(s.run_id),
            producer: s.producer,
            decision: s.decision,
            confidence: s.confidence,
            rationale: s.rationale,
            recorded_at: s.recorded_at,
            payload: s.payload,
        })
        .collect();

    Ok(WorkflowRun::restore(
        WorkflowRunId::from_uuid(row.id),
        ClaimId::from_uuid(row.claim_id),
        row.created_at,
        complexity,
        history,
        steps,
    ))
}
