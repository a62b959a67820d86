//! Custom Test Assertions
//!
//! Assertion helpers for workflow runs that print the whole audit trail on
//! failure instead of a bare `left != right`.

use domain_claims::{WorkflowRun, WorkflowStage};

fn stages(run: &WorkflowRun) -> Vec<WorkflowStage> {
    run.history().iter().map(|t| t.stage).collect()
}

/// Producers of the run's step records in append order
pub fn producers(run: &WorkflowRun) -> Vec<String> {
    run.steps().iter().map(|s| s.producer.clone()).collect()
}

/// Asserts the exact sequence of stages the run went through
pub fn assert_stage_history(run: &WorkflowRun, expected: &[WorkflowStage]) {
    assert_eq!(
        stages(run),
        expected,
        "Unexpected stage history for run {}",
        run.id()
    );
}

/// Asserts the run passed through `stage` at some point
pub fn assert_visited(run: &WorkflowRun, stage: WorkflowStage) {
    assert!(
        stages(run).contains(&stage),
        "Run {} never entered {}; history: {:?}",
        run.id(),
        stage,
        stages(run)
    );
}

/// Asserts the run never entered `stage`
pub fn assert_not_visited(run: &WorkflowRun, stage: WorkflowStage) {
    assert!(
        !stages(run).contains(&stage),
        "Run {} unexpectedly entered {}; history: {:?}",
        run.id(),
        stage,
        stages(run)
    );
}

/// Asserts the step records were produced by exactly these producers, in order
pub fn assert_producers(run: &WorkflowRun, expected: &[&str]) {
    assert_eq!(
        producers(run),
        expected,
        "Unexpected step records for run {}",
        run.id()
    );
}

/// Asserts the run failed and its reason mentions `fragment`
pub fn assert_failed_with(run: &WorkflowRun, fragment: &str) {
    assert_eq!(
        run.stage(),
        WorkflowStage::Failed,
        "Run {} did not fail; history: {:?}",
        run.id(),
        stages(run)
    );
    let reason = run.failure_reason().unwrap_or_default();
    assert!(
        reason.contains(fragment),
        "Failure reason '{}' does not mention '{}'",
        reason,
        fragment
    );
}

/// Asserts the run's timestamps never go backwards
pub fn assert_monotonic_history(run: &WorkflowRun) {
    for pair in run.history().windows(2) {
        assert!(
            pair[0].at <= pair[1].at,
            "Transition to {} at {} precedes transition to {} at {}",
            pair[1].stage,
            pair[1].at,
            pair[0].stage,
            pair[0].at
        );
    }
}
