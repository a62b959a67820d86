//! End-to-end workflow runs against a scripted analysis client

use rust_decimal_macros::dec;
use std::time::Duration;

use domain_claims::analysis::RiskLevel;
use domain_claims::config::TimeoutConfig;
use domain_claims::{
    AnalysisError, ExpectedSchema, WorkflowConfig, WorkflowOutcome, WorkflowStage,
};
use domain_claims::WorkflowStage::*;
use test_utils::{
    assert_failed_with, assert_monotonic_history, assert_not_visited, assert_producers,
    assert_stage_history, init_tracing, ClaimBuilder, ClaimFixtures, ClientFixtures,
    EngineFixture, ResultFixtures,
};

#[tokio::test]
async fn scenario_a_minor_scratch_completes() {
    init_tracing();
    let fixture = EngineFixture::new(ClientFixtures::clean());

    let result = fixture
        .engine
        .execute(ClaimFixtures::minor_scratch())
        .await
        .unwrap();

    assert_stage_history(&result.run, &[Intake, Assessment, Communication, Completed]);
    assert_producers(&result.run, &["assessment", "coverage", "risk", "synthesis"]);
    assert!(!result.run.is_escalated());
    assert_monotonic_history(&result.run);

    match result.outcome {
        WorkflowOutcome::Completed {
            synthesis,
            communication,
            missing_items,
        } => {
            assert!(!synthesis.summary.is_empty());
            assert!(communication.is_none());
            assert!(missing_items.is_empty());
        }
        other => panic!("expected completion, got {other:?}"),
    }

    assert_eq!(fixture.client.call_count(ExpectedSchema::Communication).await, 0);
    assert_eq!(fixture.client.call_count(ExpectedSchema::ImageReview).await, 0);
}

#[tokio::test]
async fn scenario_b_high_amount_goes_to_human_review() {
    let fixture = EngineFixture::new(ClientFixtures::clean());

    let result = fixture
        .engine
        .execute(ClaimFixtures::high_value())
        .await
        .unwrap();

    assert_stage_history(&result.run, &[Intake, Assessment, HumanReview]);
    assert_not_visited(&result.run, Communication);
    assert_not_visited(&result.run, Completed);
    assert_producers(&result.run, &["assessment", "coverage", "risk"]);

    let triggers = result.run.escalation_triggers();
    assert!(triggers.iter().any(|t| t.contains("75000")), "{triggers:?}");
    assert!(matches!(result.outcome, WorkflowOutcome::Escalated { .. }));
    assert_eq!(fixture.client.call_count(ExpectedSchema::Synthesis).await, 0);
}

#[tokio::test]
async fn scenario_c_one_failed_specialist_is_isolated() {
    let client = ClientFixtures::clean().fail(
        ExpectedSchema::Risk,
        AnalysisError::Transport("connection reset".to_string()),
    );
    let fixture = EngineFixture::new(client);

    let result = fixture
        .engine
        .execute(ClaimFixtures::minor_scratch())
        .await
        .unwrap();

    assert_eq!(result.stage(), Completed);
    assert_producers(&result.run, &["assessment", "coverage", "synthesis"]);
    assert!(result.run.step_for("risk").is_none());
}

#[tokio::test]
async fn scenario_c_failed_specialist_with_other_signals_escalates() {
    let client = ClientFixtures::clean().fail(ExpectedSchema::Coverage, AnalysisError::EmptyResponse);
    let fixture = EngineFixture::new(client);
    let claim = ClaimBuilder::new()
        .with_description("Driver reports a suspicious break-in")
        .build();

    let result = fixture.engine.execute(claim).await.unwrap();

    assert_eq!(result.stage(), HumanReview);
    assert_producers(&result.run, &["assessment", "risk"]);
}

#[tokio::test]
async fn scenario_d_bad_date_fails_at_intake() {
    let fixture = EngineFixture::new(ClientFixtures::clean());

    let result = fixture
        .engine
        .execute(ClaimFixtures::unparseable_date())
        .await
        .unwrap();

    assert_stage_history(&result.run, &[Intake, Failed]);
    assert_failed_with(&result.run, "last tuesday");
    assert!(result.run.steps().is_empty());
    assert!(fixture.client.calls().await.is_empty());
}

#[tokio::test]
async fn test_gaps_trigger_remediation_before_synthesis() {
    let fixture = EngineFixture::new(ClientFixtures::with_gaps());

    let result = fixture
        .engine
        .execute(ClaimFixtures::minor_scratch())
        .await
        .unwrap();

    assert_producers(
        &result.run,
        &["assessment", "coverage", "risk", "communication", "synthesis"],
    );
    let WorkflowOutcome::Completed {
        communication,
        missing_items,
        ..
    } = result.outcome
    else {
        panic!("expected completion");
    };
    assert!(communication.is_some());
    assert_eq!(missing_items.len(), 3);

    let calls = fixture.client.calls().await;
    let remediation = calls
        .iter()
        .find(|c| c.expected_schema == Some(ExpectedSchema::Communication))
        .unwrap();
    let synthesis = calls
        .iter()
        .find(|c| c.expected_schema == Some(ExpectedSchema::Synthesis))
        .unwrap();
    let instruction = &remediation.transcript.messages().last().unwrap().content;
    assert!(instruction.contains("Police report"));
    assert!(synthesis.transcript.len() > remediation.transcript.len());
}

#[tokio::test]
async fn test_image_claim_runs_image_review() {
    let fixture = EngineFixture::new(ClientFixtures::clean());

    let result = fixture
        .engine
        .execute(ClaimFixtures::with_images())
        .await
        .unwrap();

    assert_stage_history(
        &result.run,
        &[Intake, ImageProcessing, Communication, Completed],
    );
    assert_producers(
        &result.run,
        &["assessment", "coverage", "risk", "image_review", "synthesis"],
    );
}

#[tokio::test]
async fn test_severe_image_damage_escalates() {
    let severe = match ResultFixtures::relevant_images() {
        domain_claims::StructuredAnalysisResult::ImageReview(mut review) => {
            review.findings[0].damage_severity = "TOTAL_LOSS".to_string();
            domain_claims::StructuredAnalysisResult::ImageReview(review)
        }
        other => other,
    };
    let fixture =
        EngineFixture::new(ClientFixtures::clean().respond(ExpectedSchema::ImageReview, severe));

    let result = fixture
        .engine
        .execute(ClaimFixtures::with_images())
        .await
        .unwrap();

    assert_eq!(result.stage(), HumanReview);
    assert!(result.run.step_for("image_review").is_some());
}

#[tokio::test]
async fn test_missing_image_review_escalates_when_configured() {
    let client = ClientFixtures::clean().fail(
        ExpectedSchema::ImageReview,
        AnalysisError::SchemaValidation("no findings".to_string()),
    );
    let mut config = WorkflowConfig::default();
    config.escalation.escalate_on_missing_image_review = true;
    let fixture = EngineFixture::with_config(client.clone(), config);

    let result = fixture
        .engine
        .execute(ClaimFixtures::with_images())
        .await
        .unwrap();
    assert_eq!(result.stage(), HumanReview);

    let lenient = EngineFixture::new(client);
    let result = lenient
        .engine
        .execute(ClaimFixtures::with_images())
        .await
        .unwrap();
    assert_eq!(result.stage(), Completed);
}

#[tokio::test]
async fn test_all_specialists_failing_fails_the_run() {
    let client = ClientFixtures::clean()
        .fail(ExpectedSchema::Assessment, AnalysisError::EmptyResponse)
        .fail(ExpectedSchema::Coverage, AnalysisError::EmptyResponse)
        .fail(
            ExpectedSchema::Risk,
            AnalysisError::Transport("refused".to_string()),
        );
    let fixture = EngineFixture::new(client);

    let result = fixture
        .engine
        .execute(ClaimFixtures::minor_scratch())
        .await
        .unwrap();

    assert_stage_history(&result.run, &[Intake, Assessment, Failed]);
    assert_failed_with(&result.run, "all specialist analyses failed");
    assert_failed_with(&result.run, "risk");
    assert!(result.run.steps().is_empty());
}

#[tokio::test]
async fn test_text_only_synthesis_fails_but_keeps_audit_trail() {
    let client = ClientFixtures::clean().respond_text(ExpectedSchema::Synthesis, "Looks fine to me.");
    let fixture = EngineFixture::new(client);

    let result = fixture
        .engine
        .execute(ClaimFixtures::minor_scratch())
        .await
        .unwrap();

    assert_stage_history(&result.run, &[Intake, Assessment, Communication, Failed]);
    assert_failed_with(&result.run, "synthesis rejected");
    assert_producers(&result.run, &["assessment", "coverage", "risk"]);
}

#[tokio::test]
async fn test_store_mirrors_returned_run() {
    let fixture = EngineFixture::new(ClientFixtures::with_gaps());

    let result = fixture
        .engine
        .execute(ClaimFixtures::minor_scratch())
        .await
        .unwrap();
    let stored = fixture
        .engine
        .get_run_status(result.run.id())
        .await
        .unwrap();

    assert_eq!(stored, result.run);
}

#[tokio::test]
async fn test_unknown_run_status_is_an_error() {
    let fixture = EngineFixture::new(ClientFixtures::clean());
    let err = fixture
        .engine
        .get_run_status(core_kernel::WorkflowRunId::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("persistence"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_pending_specialists() {
    let client = ClientFixtures::clean()
        .delay(ExpectedSchema::Assessment, Duration::from_secs(30))
        .delay(ExpectedSchema::Coverage, Duration::from_secs(30))
        .delay(ExpectedSchema::Risk, Duration::from_secs(30));
    let fixture = EngineFixture::new(client);

    let handle = fixture
        .engine
        .start_run(ClaimFixtures::minor_scratch())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.cancel();
    let result = handle.join().await.unwrap();

    assert_failed_with(&result.run, "cancelled");
    assert!(result.run.steps().is_empty());
    assert_eq!(fixture.client.call_count(ExpectedSchema::Synthesis).await, 0);

    let stored = fixture.engine.get_run_status(result.run.id()).await.unwrap();
    assert_eq!(stored.stage(), Failed);
}

#[tokio::test(start_paused = true)]
async fn test_run_deadline_fails_with_timeout() {
    let client = ClientFixtures::clean().delay(ExpectedSchema::Synthesis, Duration::from_secs(20));
    let config = WorkflowConfig {
        timeouts: TimeoutConfig {
            analysis_call_ms: 60_000,
            run_deadline_ms: 5_000,
        },
        ..WorkflowConfig::default()
    };
    let fixture = EngineFixture::with_config(client, config);

    let result = fixture
        .engine
        .execute(ClaimFixtures::minor_scratch())
        .await
        .unwrap();

    assert_failed_with(&result.run, "timeout");
    assert_producers(&result.run, &["assessment", "coverage", "risk"]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_specialist_times_out_alone() {
    let client = ClientFixtures::clean().delay(ExpectedSchema::Coverage, Duration::from_secs(90));
    let fixture = EngineFixture::new(client);

    let result = fixture
        .engine
        .execute(ClaimFixtures::minor_scratch())
        .await
        .unwrap();

    assert_eq!(result.stage(), Completed);
    assert_producers(&result.run, &["assessment", "risk", "synthesis"]);
}

#[tokio::test]
async fn test_elevated_risk_requests_timeline() {
    let risky = match ResultFixtures::low_risk() {
        domain_claims::StructuredAnalysisResult::Risk(mut risk) => {
            risk.level = RiskLevel::Medium;
            domain_claims::StructuredAnalysisResult::Risk(risk)
        }
        other => other,
    };
    let fixture = EngineFixture::new(ClientFixtures::clean().respond(ExpectedSchema::Risk, risky));
    let claim = ClaimBuilder::new().with_amount(dec!(2400)).build();

    let result = fixture.engine.execute(claim).await.unwrap();

    let WorkflowOutcome::Completed { missing_items, .. } = result.outcome else {
        panic!("expected completion");
    };
    assert!(missing_items
        .iter()
        .any(|item| item.description.starts_with("Written timeline")));
    assert!(result.run.step_for("communication").is_some());
    assert_eq!(result.run.stage(), WorkflowStage::Completed);
}
