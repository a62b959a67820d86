//! Claims Evaluation Workflow
//!
//! This crate evaluates a submitted claim by running independent specialist
//! analyses concurrently and synthesizing them into an auditable
//! recommendation for a human reviewer.
//!
//! # Run Lifecycle
//!
//! ```text
//! INTAKE -> ASSESSMENT | IMAGE_PROCESSING -> HUMAN_REVIEW
//!                                         -> COMMUNICATION -> COMPLETED
//! (any non-terminal stage) -> FAILED
//! ```
//!
//! Deterministic rules (complexity, escalation, evidence gaps) live in their
//! own modules and never call out. The [`workflow`] module sequences them
//! around the reasoning capability behind [`ports::AnalysisClient`].

pub mod adapters;
pub mod analysis;
pub mod claim;
pub mod complexity;
pub mod config;
pub mod error;
pub mod escalation;
pub mod gaps;
pub mod ports;
pub mod run;
pub mod step;
pub mod transcript;
pub mod workflow;

pub use analysis::{
    AnalysisRequest, AnalysisResponse, ExpectedSchema, StructuredAnalysisResult,
};
pub use claim::{ClaimImage, ClaimSubmission, EvidenceFlags, Incident, LossType};
pub use complexity::{ComplexityClassifier, ComplexityConfig, ComplexityLevel};
pub use config::{TimeoutConfig, WorkflowConfig};
pub use error::{AnalysisError, ValidationError, WorkflowError};
pub use escalation::{EscalationConfig, EscalationDecision, EscalationGate, ImageSummary};
pub use gaps::{GapAnalyzer, GapRule, MissingItem};
pub use ports::{AnalysisClient, WorkflowStore};
pub use run::{StageTransition, WorkflowRun, WorkflowStage};
pub use step::StepRecord;
pub use transcript::{Message, Role, Transcript};
pub use workflow::{RunHandle, WorkflowEngine, WorkflowOutcome, WorkflowResult};
