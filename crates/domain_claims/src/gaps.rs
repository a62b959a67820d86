//! Missing-evidence derivation
//!
//! Turns the structured specialist results into the list of items the
//! claimant should be asked for. Only structured results count; a specialist
//! that failed contributes nothing.

use serde::{Deserialize, Serialize};

use crate::analysis::{CoverageStatus, RiskLevel, StructuredAnalysisResult, Validity};
use crate::claim::LossType;

pub const VEHICLE_PHOTOS: &str = "Clear photos of the vehicle damage from multiple angles";
pub const POLICE_REPORT: &str = "Police report or incident report number";
pub const PROPERTY_PHOTOS: &str = "Photos of the damaged property or items";
pub const REPAIR_ESTIMATE: &str = "Repair estimate or invoice from a qualified contractor";
pub const CLARIFICATION: &str = "Additional details clarifying the circumstances of the incident";
pub const POLICY_DOCUMENTS: &str =
    "Copy of the policy declarations page or relevant coverage documentation";
pub const IDENTITY_PROOF: &str = "Proof of identity and proof of ownership for the claimed items";
pub const TIMELINE: &str =
    "Written timeline of events with any supporting receipts or witness details";

/// Rule that produced a missing item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapRule {
    QuestionableValidity,
    InvalidClaim,
    RedFlag,
    InsufficientCoverageEvidence,
    FraudIndicators,
    ElevatedRisk,
}

/// One item to request from the claimant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingItem {
    pub description: String,
    pub rule: GapRule,
}

/// Derives missing items from specialist results
#[derive(Debug, Clone, Copy, Default)]
pub struct GapAnalyzer;

impl GapAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Ordered, deduplicated items; empty when every input is clean
    pub fn derive_missing_items<'a, I>(&self, results: I, loss_type: LossType) -> Vec<MissingItem>
    where
        I: IntoIterator<Item = &'a StructuredAnalysisResult>,
    {
        let vehicle = loss_type.is_vehicle();
        let mut items: Vec<MissingItem> = Vec::new();
        let mut push = |description: String, rule: GapRule| {
            if !items.iter().any(|i| i.description == description) {
                items.push(MissingItem { description, rule });
            }
        };

        for result in results {
            match result {
                StructuredAnalysisResult::Assessment(a) => {
                    match a.validity {
                        Validity::Questionable if vehicle => {
                            push(VEHICLE_PHOTOS.into(), GapRule::QuestionableValidity);
                            push(POLICE_REPORT.into(), GapRule::QuestionableValidity);
                        }
                        Validity::Questionable => {
                            push(PROPERTY_PHOTOS.into(), GapRule::QuestionableValidity);
                            push(REPAIR_ESTIMATE.into(), GapRule::QuestionableValidity);
                        }
                        Validity::Invalid => push(CLARIFICATION.into(), GapRule::InvalidClaim),
                        Validity::Valid => {}
                    }
                    for flag in &a.red_flags {
                        push(format!("Clarification regarding: {flag}"), GapRule::RedFlag);
                    }
                }
                StructuredAnalysisResult::Coverage(c) => {
                    if c.status == CoverageStatus::InsufficientEvidence {
                        push(
                            POLICY_DOCUMENTS.into(),
                            GapRule::InsufficientCoverageEvidence,
                        );
                    }
                }
                StructuredAnalysisResult::Risk(r) => {
                    if !r.fraud_indicators.is_empty() {
                        push(IDENTITY_PROOF.into(), GapRule::FraudIndicators);
                    } else if matches!(r.level, RiskLevel::Medium | RiskLevel::High) {
                        push(TIMELINE.into(), GapRule::ElevatedRisk);
                        if vehicle {
                            push(POLICE_REPORT.into(), GapRule::ElevatedRisk);
                        }
                    }
                }
                _ => {}
            }
        }

        items
    }

    /// Descriptions only
    pub fn missing_descriptions<'a, I>(&self, results: I, loss_type: LossType) -> Vec<String>
    where
        I: IntoIterator<Item = &'a StructuredAnalysisResult>,
    {
        self.derive_missing_items(results, loss_type)
            .into_iter()
            .map(|i| i.description)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AssessmentResult, CoverageResult, RiskResult};

    fn assessment(validity: Validity, flags: &[&str]) -> StructuredAnalysisResult {
        StructuredAnalysisResult::Assessment(AssessmentResult {
            validity,
            cost_assessment: "In line with regional repair costs".into(),
            red_flags: flags.iter().map(|f| f.to_string()).collect(),
            confidence: 0.8,
        })
    }

    fn coverage(status: CoverageStatus) -> StructuredAnalysisResult {
        StructuredAnalysisResult::Coverage(CoverageResult {
            status,
            cited_sections: vec![],
            details: String::new(),
            confidence: 0.8,
        })
    }

    fn risk(level: RiskLevel, indicators: &[&str]) -> StructuredAnalysisResult {
        StructuredAnalysisResult::Risk(RiskResult {
            level,
            score: 40,
            fraud_indicators: indicators.iter().map(|f| f.to_string()).collect(),
            analysis: String::new(),
            confidence: 0.8,
        })
    }

    #[test]
    fn test_clean_results_yield_nothing() {
        let results = vec![
            assessment(Validity::Valid, &[]),
            coverage(CoverageStatus::Covered),
            risk(RiskLevel::Low, &[]),
        ];
        assert!(GapAnalyzer::new()
            .derive_missing_items(&results, LossType::Vehicle)
            .is_empty());
    }

    #[test]
    fn test_questionable_vehicle_claim() {
        let results = vec![assessment(Validity::Questionable, &[])];
        assert_eq!(
            GapAnalyzer::new().missing_descriptions(&results, LossType::Vehicle),
            vec![VEHICLE_PHOTOS.to_string(), POLICE_REPORT.to_string()]
        );
    }

    #[test]
    fn test_questionable_property_claim() {
        let results = vec![assessment(Validity::Questionable, &[])];
        assert_eq!(
            GapAnalyzer::new().missing_descriptions(&results, LossType::Property),
            vec![PROPERTY_PHOTOS.to_string(), REPAIR_ESTIMATE.to_string()]
        );
    }

    #[test]
    fn test_red_flags_and_invalid() {
        let results = vec![assessment(
            Validity::Invalid,
            &["date precedes policy start", "receipt altered"],
        )];
        let items = GapAnalyzer::new().derive_missing_items(&results, LossType::Theft);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].rule, GapRule::InvalidClaim);
        assert_eq!(
            items[2].description,
            "Clarification regarding: receipt altered"
        );
    }

    #[test]
    fn test_fraud_indicators_take_precedence_over_level() {
        let results = vec![risk(RiskLevel::High, &["claim filed days after policy start"])];
        assert_eq!(
            GapAnalyzer::new().missing_descriptions(&results, LossType::Vehicle),
            vec![IDENTITY_PROOF.to_string()]
        );
    }

    #[test]
    fn test_elevated_risk_adds_police_report_for_vehicles_only() {
        let results = vec![risk(RiskLevel::Medium, &[])];
        let analyzer = GapAnalyzer::new();
        assert_eq!(
            analyzer.missing_descriptions(&results, LossType::Vehicle),
            vec![TIMELINE.to_string(), POLICE_REPORT.to_string()]
        );
        assert_eq!(
            analyzer.missing_descriptions(&results, LossType::Property),
            vec![TIMELINE.to_string()]
        );
    }

    #[test]
    fn test_duplicates_keep_first_rule() {
        let results = vec![
            assessment(Validity::Questionable, &["x", "x"]),
            coverage(CoverageStatus::InsufficientEvidence),
            risk(RiskLevel::High, &[]),
        ];
        let items = GapAnalyzer::new().derive_missing_items(&results, LossType::Vehicle);
        let descriptions: Vec<_> = items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                VEHICLE_PHOTOS,
                POLICE_REPORT,
                "Clarification regarding: x",
                POLICY_DOCUMENTS,
                TIMELINE
            ]
        );
        let police = items.iter().find(|i| i.description == POLICE_REPORT).unwrap();
        assert_eq!(police.rule, GapRule::QuestionableValidity);
    }
}
