//! Workflow run repository
//!
//! Runs, their stage history, and their step records live in three tables.
//! History and steps are append-only; the run row carries the current stage
//! and is locked while a transition is validated and written.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for a workflow run
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkflowRunRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub stage: String,
    pub complexity: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for one stage transition
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StageTransitionRow {
    pub run_id: Uuid,
    pub stage: String,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
    pub triggers: Json<Vec<String>>,
}

/// Database row for one step record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StepRecordRow {
    pub id: Uuid,
    pub run_id: Uuid,
    pub producer: String,
    pub decision: String,
    pub confidence: f64,
    pub rationale: String,
    pub recorded_at: DateTime<Utc>,
    pub payload: Value,
}

/// Repository for workflow runs and their audit log
#[derive(Debug, Clone)]
pub struct WorkflowRepository {
    pool: PgPool,
}

impl WorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a run together with whatever history and steps it already has
    pub async fn insert_run(
        &self,
        run: &WorkflowRunRow,
        transitions: &[StageTransitionRow],
        steps: &[StepRecordRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO workflow_runs (id, claim_id, stage, complexity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run.id)
        .bind(run.claim_id)
        .bind(&run.stage)
        .bind(&run.complexity)
        .bind(run.created_at)
        .bind(run.updated_at)
        .execute(&mut *tx)
        .await?;

        for transition in transitions {
            insert_transition(&mut tx, transition).await?;
        }
        for step in steps {
            insert_step(&mut tx, step).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Sets the complexity level of a run
    pub async fn set_complexity(&self, run_id: Uuid, complexity: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE workflow_runs SET complexity = $2 WHERE id = $1")
            .bind(run_id)
            .bind(complexity)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("WorkflowRun", run_id));
        }
        Ok(())
    }

    /// Appends a step record
    ///
    /// Returns `false` when a record with the same id was already stored.
    pub async fn append_step(&self, step: &StepRecordRow) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        lock_run_stage(&mut tx, step.run_id).await?;

        let inserted = insert_step(&mut tx, step).await?;
        if inserted {
            touch_run(&mut tx, step.run_id, None, step.recorded_at).await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Appends a stage transition if `accepts` allows leaving the current stage
    pub async fn append_transition<F>(
        &self,
        transition: &StageTransitionRow,
        accepts: F,
    ) -> Result<(), DatabaseError>
    where
        F: FnOnce(&str) -> bool + Send,
    {
        let mut tx = self.pool.begin().await?;
        let current = lock_run_stage(&mut tx, transition.run_id).await?;

        if !accepts(&current) {
            return Err(DatabaseError::ConstraintViolation(format!(
                "run {} cannot move from {} to {}",
                transition.run_id, current, transition.stage
            )));
        }

        insert_transition(&mut tx, transition).await?;
        touch_run(&mut tx, transition.run_id, Some(&transition.stage), transition.at).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_run(&self, run_id: Uuid) -> Result<WorkflowRunRow, DatabaseError> {
        sqlx::query_as::<_, WorkflowRunRow>(
            r#"
            SELECT id, claim_id, stage, complexity, created_at, updated_at
            FROM workflow_runs
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("WorkflowRun", run_id))
    }

    /// Stage history in the order it was written
    pub async fn transitions(&self, run_id: Uuid) -> Result<Vec<StageTransitionRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, StageTransitionRow>(
            r#"
            SELECT run_id, stage, at, note, triggers
            FROM workflow_stage_transitions
            WHERE run_id = $1
            ORDER BY seq
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Step records in the order they were written
    pub async fn steps(&self, run_id: Uuid) -> Result<Vec<StepRecordRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, StepRecordRow>(
            r#"
            SELECT id, run_id, producer, decision, confidence, rationale, recorded_at, payload
            FROM workflow_step_records
            WHERE run_id = $1
            ORDER BY seq
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

async fn lock_run_stage(tx: &mut Tx<'_>, run_id: Uuid) -> Result<String, DatabaseError> {
    sqlx::query_scalar::<_, String>("SELECT stage FROM workflow_runs WHERE id = $1 FOR UPDATE")
        .bind(run_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| DatabaseError::not_found("WorkflowRun", run_id))
}

async fn touch_run(
    tx: &mut Tx<'_>,
    run_id: Uuid,
    stage: Option<&str>,
    at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE workflow_runs
        SET stage = COALESCE($2, stage),
            updated_at = GREATEST(updated_at, $3)
        WHERE id = $1
        "#,
    )
    .bind(run_id)
    .bind(stage)
    .bind(at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_transition(tx: &mut Tx<'_>, row: &StageTransitionRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO workflow_stage_transitions (run_id, stage, at, note, triggers)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(row.run_id)
    .bind(&row.stage)
    .bind(row.at)
    .bind(&row.note)
    .bind(&row.triggers)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_step(tx: &mut Tx<'_>, row: &StepRecordRow) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO workflow_step_records (
            id, run_id, producer, decision, confidence, rationale, recorded_at, payload
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(row.id)
    .bind(row.run_id)
    .bind(&row.producer)
    .bind(&row.decision)
    .bind(row.confidence)
    .bind(&row.rationale)
    .bind(row.recorded_at)
    .bind(&row.payload)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}
