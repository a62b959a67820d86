//! Concurrent specialist fan-out and deterministic merge
//!
//! Every task in a set gets the same input transcript and runs concurrently.
//! The coordinator waits for all of them (each bounded by the per-call
//! timeout) before anything downstream sees a result. Merging follows the
//! declared task order, never completion order, so the merged transcript is
//! identical however the calls interleave.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::analysis::{AnalysisRequest, ExpectedSchema, StructuredAnalysisResult};
use crate::claim::ClaimSubmission;
use crate::error::{AnalysisError, WorkflowError};
use crate::escalation::ImageSummary;
use crate::ports::AnalysisClient;
use crate::transcript::{Message, Transcript};

use super::call_with_timeout;
use super::prompts;

/// Independent analyses run during the specialist stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecialistTask {
    Assessment,
    Coverage,
    Risk,
    ImageReview,
}

pub const STANDARD_TASKS: [SpecialistTask; 3] = [
    SpecialistTask::Assessment,
    SpecialistTask::Coverage,
    SpecialistTask::Risk,
];

pub const IMAGE_AWARE_TASKS: [SpecialistTask; 4] = [
    SpecialistTask::Assessment,
    SpecialistTask::Coverage,
    SpecialistTask::Risk,
    SpecialistTask::ImageReview,
];

impl SpecialistTask {
    /// Producer name used on step records and transcript messages
    pub fn name(&self) -> &'static str {
        match self {
            SpecialistTask::Assessment => "assessment",
            SpecialistTask::Coverage => "coverage",
            SpecialistTask::Risk => "risk",
            SpecialistTask::ImageReview => "image_review",
        }
    }

    pub fn schema(&self) -> ExpectedSchema {
        match self {
            SpecialistTask::Assessment => ExpectedSchema::Assessment,
            SpecialistTask::Coverage => ExpectedSchema::Coverage,
            SpecialistTask::Risk => ExpectedSchema::Risk,
            SpecialistTask::ImageReview => ExpectedSchema::ImageReview,
        }
    }

    pub fn system_context(&self) -> &'static str {
        match self {
            SpecialistTask::Assessment => prompts::ASSESSMENT_CONTEXT,
            SpecialistTask::Coverage => prompts::COVERAGE_CONTEXT,
            SpecialistTask::Risk => prompts::RISK_CONTEXT,
            SpecialistTask::ImageReview => prompts::IMAGE_REVIEW_CONTEXT,
        }
    }

    /// Task set for a claim: image-aware when images are attached
    pub fn for_claim(claim: &ClaimSubmission) -> &'static [SpecialistTask] {
        if claim.has_images() {
            &IMAGE_AWARE_TASKS
        } else {
            &STANDARD_TASKS
        }
    }
}

/// Joined output of one specialist stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecialistBundle {
    /// Tasks in declaration order
    pub tasks: Vec<SpecialistTask>,
    pub merged_transcript: Transcript,
    pub results: BTreeMap<SpecialistTask, StructuredAnalysisResult>,
    /// Last assistant text per task
    pub texts: BTreeMap<SpecialistTask, String>,
    /// Messages each task added on top of the shared input
    pub raw_messages: BTreeMap<SpecialistTask, Vec<Message>>,
    pub failures: BTreeMap<SpecialistTask, AnalysisError>,
}

impl SpecialistBundle {
    /// Structured results in declaration order
    pub fn structured_results(
        &self,
    ) -> impl Iterator<Item = (SpecialistTask, &StructuredAnalysisResult)> + '_ {
        self.tasks
            .iter()
            .filter_map(|task| self.results.get(task).map(|r| (*task, r)))
    }

    pub fn image_summary(&self) -> Option<ImageSummary> {
        self.results
            .get(&SpecialistTask::ImageReview)
            .and_then(StructuredAnalysisResult::as_image_review)
            .map(ImageSummary::from)
    }

    pub fn succeeded(&self, task: SpecialistTask) -> bool {
        self.tasks.contains(&task) && !self.failures.contains_key(&task)
    }
}

/// Runs a task set concurrently and merges the replies
#[derive(Clone)]
pub struct SpecialistCoordinator {
    client: Arc<dyn AnalysisClient>,
    call_timeout: Duration,
}

impl SpecialistCoordinator {
    pub fn new(client: Arc<dyn AnalysisClient>, call_timeout: Duration) -> Self {
        Self {
            client,
            call_timeout,
        }
    }

    /// Fans out `tasks` over `input` and joins them all
    ///
    /// Individual failures are recorded in the bundle; the stage fails only
    /// when no task succeeded. Dropping the returned future drops every
    /// call still in flight.
    pub async fn run_specialists(
        &self,
        tasks: &[SpecialistTask],
        input: &Transcript,
    ) -> Result<SpecialistBundle, WorkflowError> {
        let calls = tasks.iter().map(|&task| {
            let request = AnalysisRequest {
                system_context: task.system_context().to_string(),
                transcript: input.clone(),
                expected_schema: Some(task.schema()),
            };
            let client = Arc::clone(&self.client);
            let limit = self.call_timeout;
            async move {
                let outcome = call_with_timeout(client.as_ref(), request, limit)
                    .await
                    .and_then(|response| {
                        if let Some(result) = &response.structured {
                            task.schema().check(result)?;
                        } else if response.transcript.len() <= input.len()
                            && response.raw_text.trim().is_empty()
                        {
                            return Err(AnalysisError::EmptyResponse);
                        }
                        Ok(response)
                    });
                (task, outcome)
            }
        });
        let outcomes = join_all(calls).await;

        let mut bundle = SpecialistBundle {
            tasks: tasks.to_vec(),
            ..SpecialistBundle::default()
        };
        let mut transcripts: BTreeMap<SpecialistTask, Transcript> = BTreeMap::new();

        for (task, outcome) in outcomes {
            match outcome {
                Ok(response) => {
                    debug!(
                        task = task.name(),
                        structured = response.structured.is_some(),
                        "Specialist finished"
                    );
                    if let Some(result) = response.structured {
                        bundle.results.insert(task, result);
                    }
                    let text = response
                        .transcript
                        .last_assistant_text()
                        .map(str::to_string)
                        .or_else(|| Some(response.raw_text.clone()))
                        .filter(|t| !t.trim().is_empty());
                    if let Some(text) = text {
                        bundle.texts.insert(task, text);
                    }
                    let added = response
                        .transcript
                        .messages()
                        .iter()
                        .skip(input.len())
                        .cloned()
                        .collect();
                    bundle.raw_messages.insert(task, added);
                    transcripts.insert(task, response.transcript);
                }
                Err(error) => {
                    warn!(task = task.name(), error = %error, "Specialist failed");
                    bundle.failures.insert(task, error);
                }
            }
        }

        if !tasks.is_empty() && bundle.failures.len() == tasks.len() {
            let detail = tasks
                .iter()
                .filter_map(|t| bundle.failures.get(t).map(|e| format!("{}: {e}", t.name())))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(WorkflowError::Aggregation(detail));
        }

        bundle.merged_transcript = merge_transcripts(tasks, input, &transcripts);
        debug!(
            messages = bundle.merged_transcript.len(),
            failed = bundle.failures.len(),
            "Merged specialist transcripts"
        );
        Ok(bundle)
    }
}

/// First declared task's full transcript, then each later task's assistant
/// messages, in declaration order
///
/// When the first task failed the shared input takes its place.
fn merge_transcripts(
    tasks: &[SpecialistTask],
    input: &Transcript,
    transcripts: &BTreeMap<SpecialistTask, Transcript>,
) -> Transcript {
    let mut tasks = tasks.iter();
    let mut merged = match tasks.next() {
        Some(first) => match transcripts.get(first) {
            Some(full) => tag_after(full, input.len(), first.name()),
            None => input.clone(),
        },
        None => return input.clone(),
    };

    for task in tasks {
        if let Some(transcript) = transcripts.get(task) {
            for message in transcript.assistant_messages_after(input.len()) {
                merged.push(authored(message, task.name()));
            }
        }
    }
    merged
}

fn tag_after(transcript: &Transcript, offset: usize, author: &str) -> Transcript {
    Transcript::from_messages(
        transcript
            .messages()
            .iter()
            .enumerate()
            .map(|(i, m)| {
                if i >= offset && m.is_assistant() {
                    authored(m, author)
                } else {
                    m.clone()
                }
            })
            .collect(),
    )
}

fn authored(message: &Message, author: &str) -> Message {
    match message.author {
        Some(_) => message.clone(),
        None => message.clone().with_author(author),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        AssessmentResult, CoverageResult, CoverageStatus, RiskLevel, RiskResult, Validity,
    };
    use crate::ports::mock::MockAnalysisClient;

    fn assessment() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Assessment(AssessmentResult {
            validity: Validity::Valid,
            cost_assessment: "Reasonable".into(),
            red_flags: vec![],
            confidence: 0.9,
        })
    }

    fn coverage() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Coverage(CoverageResult {
            status: CoverageStatus::Covered,
            cited_sections: vec!["2.1".into()],
            details: "Collision cover applies".into(),
            confidence: 0.85,
        })
    }

    fn risk() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Risk(RiskResult {
            level: RiskLevel::Low,
            score: 12,
            fraud_indicators: vec![],
            analysis: "No indicators".into(),
            confidence: 0.8,
        })
    }

    fn input() -> Transcript {
        Transcript::from_messages(vec![Message::user("Claim brief")])
    }

    fn coordinator(client: MockAnalysisClient) -> SpecialistCoordinator {
        SpecialistCoordinator::new(Arc::new(client), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_all_specialists_succeed() {
        let client = MockAnalysisClient::new()
            .respond(ExpectedSchema::Assessment, assessment())
            .respond(ExpectedSchema::Coverage, coverage())
            .respond(ExpectedSchema::Risk, risk());

        let bundle = coordinator(client)
            .run_specialists(&STANDARD_TASKS, &input())
            .await
            .unwrap();

        assert_eq!(bundle.results.len(), 3);
        assert!(bundle.failures.is_empty());
        let authors: Vec<_> = bundle
            .merged_transcript
            .messages()
            .iter()
            .map(|m| m.author.as_deref())
            .collect();
        assert_eq!(
            authors,
            vec![None, Some("assessment"), Some("coverage"), Some("risk")]
        );
        let order: Vec<_> = bundle.structured_results().map(|(t, _)| t).collect();
        assert_eq!(order, STANDARD_TASKS.to_vec());
    }

    #[tokio::test]
    async fn test_one_failure_is_isolated() {
        let client = MockAnalysisClient::new()
            .respond(ExpectedSchema::Assessment, assessment())
            .fail(
                ExpectedSchema::Coverage,
                AnalysisError::Transport("connection reset".into()),
            )
            .respond(ExpectedSchema::Risk, risk());

        let bundle = coordinator(client)
            .run_specialists(&STANDARD_TASKS, &input())
            .await
            .unwrap();

        assert!(!bundle.results.contains_key(&SpecialistTask::Coverage));
        assert!(!bundle.succeeded(SpecialistTask::Coverage));
        assert_eq!(bundle.results.len(), 2);
        assert_eq!(bundle.merged_transcript.len(), 3);
    }

    #[tokio::test]
    async fn test_first_task_failure_falls_back_to_input() {
        let client = MockAnalysisClient::new()
            .fail(ExpectedSchema::Assessment, AnalysisError::EmptyResponse)
            .respond(ExpectedSchema::Coverage, coverage())
            .respond(ExpectedSchema::Risk, risk());

        let bundle = coordinator(client)
            .run_specialists(&STANDARD_TASKS, &input())
            .await
            .unwrap();

        let messages = bundle.merged_transcript.messages();
        assert_eq!(messages[0].content, "Claim brief");
        assert_eq!(messages[1].author.as_deref(), Some("coverage"));
        assert_eq!(messages[2].author.as_deref(), Some("risk"));
    }

    #[tokio::test]
    async fn test_wrong_kind_counts_as_failure() {
        let client = MockAnalysisClient::new()
            .respond(ExpectedSchema::Assessment, assessment())
            .respond(ExpectedSchema::Coverage, risk())
            .respond(ExpectedSchema::Risk, risk());

        let bundle = coordinator(client)
            .run_specialists(&STANDARD_TASKS, &input())
            .await
            .unwrap();

        assert!(matches!(
            bundle.failures.get(&SpecialistTask::Coverage),
            Some(AnalysisError::SchemaValidation(_))
        ));
    }

    #[tokio::test]
    async fn test_text_only_reply_kept_without_result() {
        let client = MockAnalysisClient::new()
            .respond(ExpectedSchema::Assessment, assessment())
            .respond_text(ExpectedSchema::Coverage, "Probably covered under 2.1")
            .respond(ExpectedSchema::Risk, risk());

        let bundle = coordinator(client)
            .run_specialists(&STANDARD_TASKS, &input())
            .await
            .unwrap();

        assert!(!bundle.results.contains_key(&SpecialistTask::Coverage));
        assert_eq!(
            bundle.texts.get(&SpecialistTask::Coverage).map(String::as_str),
            Some("Probably covered under 2.1")
        );
        assert!(bundle.failures.is_empty());
    }

    #[tokio::test]
    async fn test_all_failed_is_aggregation_error() {
        let client = MockAnalysisClient::new();
        let err = coordinator(client)
            .run_specialists(&STANDARD_TASKS, &input())
            .await
            .unwrap_err();
        match err {
            WorkflowError::Aggregation(detail) => {
                assert!(detail.contains("assessment"));
                assert!(detail.contains("risk"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_specialist_times_out() {
        let client = MockAnalysisClient::new()
            .respond(ExpectedSchema::Assessment, assessment())
            .respond(ExpectedSchema::Coverage, coverage())
            .delay(ExpectedSchema::Coverage, Duration::from_secs(120))
            .respond(ExpectedSchema::Risk, risk());

        let bundle = SpecialistCoordinator::new(Arc::new(client), Duration::from_secs(60))
            .run_specialists(&STANDARD_TASKS, &input())
            .await
            .unwrap();

        assert_eq!(
            bundle.failures.get(&SpecialistTask::Coverage),
            Some(&AnalysisError::Timeout { after_ms: 60_000 })
        );
    }
}
