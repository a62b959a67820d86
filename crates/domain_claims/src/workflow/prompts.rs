//! System contexts and instructions sent to the reasoning capability

use std::fmt::Write as _;

use crate::claim::ClaimSubmission;
use crate::gaps::MissingItem;
use crate::transcript::{Message, Transcript};

pub const ASSESSMENT_CONTEXT: &str = "You are a claims assessor. Judge whether the incident \
described is plausible and consistent, whether the claimed amount is reasonable for the loss, \
and list any red flags. Reply with an assessment result.";

pub const COVERAGE_CONTEXT: &str = "You are a policy coverage analyst. Decide whether the loss \
is covered by the referenced policy, cite the relevant policy sections, and say when the \
evidence is insufficient to decide. Reply with a coverage result.";

pub const RISK_CONTEXT: &str = "You are a fraud and risk analyst. Rate the claim's risk level, \
give a score from 0 to 100, and list concrete fraud indicators if any. Reply with a risk result.";

pub const IMAGE_REVIEW_CONTEXT: &str = "You review claim photographs. Rate how well the images \
support the described incident from 0 to 1 and describe the damage severity shown in each image. \
Reply with an image review result.";

pub const COMPLEXITY_CONTEXT: &str = "You triage incoming claims. Rate the handling complexity \
as LOW, MEDIUM or HIGH, with your confidence, reasoning, risk factors and the expertise needed. \
Reply with a complexity review.";

pub const COMMUNICATION_CONTEXT: &str = "You write to claimants on behalf of the claims team. \
Draft a short, courteous message requesting exactly the listed items. Reply with a \
communication draft.";

pub const SYNTHESIS_CONTEXT: &str = "You are the senior claims reviewer. Using only the \
findings already in this conversation, recommend APPROVE, DENY or INVESTIGATE with a confidence \
tier, a summary, key findings and next steps. Do not introduce new facts. Reply with a \
synthesis result.";

/// Renders the claim as the opening user message
pub fn claim_brief(claim: &ClaimSubmission) -> String {
    let mut brief = String::new();
    let _ = writeln!(brief, "Claim {}", claim.id);
    let _ = writeln!(brief, "Policy: {}", claim.policy_reference);
    let _ = writeln!(brief, "Loss type: {:?}", claim.loss_type);
    let _ = writeln!(brief, "Incident date: {}", claim.incident.date);
    if let Some(location) = &claim.incident.location {
        let _ = writeln!(brief, "Location: {location}");
    }
    let _ = writeln!(brief, "Claimed amount: {}", claim.claimed_amount);
    let _ = writeln!(brief, "Description: {}", claim.incident.description);
    let _ = writeln!(
        brief,
        "Evidence: incident report {}, photos {}, police report {}",
        yes_no(claim.evidence.incident_report),
        yes_no(claim.evidence.photos),
        yes_no(claim.evidence.police_report),
    );
    for image in &claim.images {
        let _ = write!(brief, "Image {} ({}, {})", image.id, image.file_name, image.media_type);
        match &image.caption {
            Some(caption) => {
                let _ = writeln!(brief, ": {caption}");
            }
            None => brief.push('\n'),
        }
    }
    brief
}

/// Starting transcript shared by every specialist
pub fn claim_transcript(claim: &ClaimSubmission) -> Transcript {
    Transcript::from_messages(vec![Message::user(claim_brief(claim))])
}

/// Instruction appended before drafting the claimant request
pub fn remediation_instruction(items: &[MissingItem]) -> Message {
    let mut text = String::from("The following items are missing from this claim:\n");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(text, "{}. {}", i + 1, item.description);
    }
    text.push_str("Draft a request to the claimant for these items.");
    Message::user(text)
}

pub fn synthesis_instruction() -> Message {
    Message::user("Synthesize the findings above into a final recommendation.")
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "provided"
    } else {
        "missing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{ClaimImage, EvidenceFlags, Incident, LossType};
    use crate::gaps::GapRule;
    use core_kernel::{ClaimId, Currency, ImageId, Money};
    use rust_decimal_macros::dec;

    #[test]
    fn test_brief_lists_claim_facts() {
        let claim = ClaimSubmission {
            id: ClaimId::new(),
            policy_reference: "POL-AUTO-9".into(),
            loss_type: LossType::Vehicle,
            incident: Incident {
                date: "2024-04-11".into(),
                description: "Hit a pothole".into(),
                location: None,
            },
            claimed_amount: Money::new(dec!(640), Currency::USD),
            evidence: EvidenceFlags {
                incident_report: true,
                photos: false,
                police_report: false,
            },
            images: vec![ClaimImage {
                id: ImageId::new(),
                file_name: "wheel.jpg".into(),
                media_type: "image/jpeg".into(),
                caption: Some("bent rim".into()),
            }],
        };
        let brief = claim_brief(&claim);
        assert!(brief.contains("Policy: POL-AUTO-9"));
        assert!(brief.contains("photos missing"));
        assert!(brief.contains("wheel.jpg"));
        assert!(brief.contains(": bent rim"));
        assert_eq!(claim_transcript(&claim).len(), 1);
    }

    #[test]
    fn test_remediation_instruction_numbers_items() {
        let items = vec![
            MissingItem {
                description: "Repair estimate".into(),
                rule: GapRule::QuestionableValidity,
            },
            MissingItem {
                description: "Proof of ownership".into(),
                rule: GapRule::FraudIndicators,
            },
        ];
        let message = remediation_instruction(&items);
        assert!(message.content.contains("1. Repair estimate"));
        assert!(message.content.contains("2. Proof of ownership"));
    }
}
