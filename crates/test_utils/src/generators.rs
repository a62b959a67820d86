//! Property-Based Test Generators
//!
//! Proptest strategies for claims and specialist results that keep the
//! domain invariants intact.

use proptest::prelude::*;
use std::time::Duration;

use core_kernel::{Currency, Money};
use domain_claims::analysis::{
    AssessmentResult, CoverageResult, CoverageStatus, RiskLevel, RiskResult, Validity,
};
use domain_claims::{ClaimSubmission, LossType, StructuredAnalysisResult};

use crate::builders::ClaimBuilder;

/// Descriptions that trip neither complexity nor escalation keywords
const BENIGN_DESCRIPTIONS: &[&str] = &[
    "minor scratch",
    "Cracked windscreen from road debris",
    "Dent in rear door after parking",
    "Water stain on bedroom ceiling",
    "Broken side mirror",
    "Laptop screen cracked when dropped",
    "Lost luggage on connecting flight",
];

pub fn loss_type_strategy() -> impl Strategy<Value = LossType> {
    prop_oneof![
        Just(LossType::Vehicle),
        Just(LossType::Property),
        Just(LossType::Theft),
        Just(LossType::Liability),
        Just(LossType::Health),
        Just(LossType::Travel),
        Just(LossType::Other),
    ]
}

pub fn benign_description_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(BENIGN_DESCRIPTIONS).prop_map(str::to_string)
}

/// USD amounts between `min_minor` and `max_minor` cents inclusive
pub fn usd_money_strategy(min_minor: i64, max_minor: i64) -> impl Strategy<Value = Money> {
    (min_minor..=max_minor).prop_map(|minor| Money::from_minor(minor, Currency::USD))
}

/// Claims up to 10,000 USD with full evidence, no images and no keywords
pub fn small_clean_claim_strategy() -> impl Strategy<Value = ClaimSubmission> {
    (
        usd_money_strategy(0, 1_000_000),
        benign_description_strategy(),
        loss_type_strategy(),
    )
        .prop_map(|(amount, description, loss_type)| {
            ClaimBuilder::new()
                .with_money(amount)
                .with_description(description)
                .with_loss_type(loss_type)
                .build()
        })
}

/// Claims strictly above 50,000 USD, otherwise clean
pub fn high_amount_claim_strategy() -> impl Strategy<Value = ClaimSubmission> {
    (
        usd_money_strategy(5_000_001, 1_000_000_000),
        benign_description_strategy(),
        loss_type_strategy(),
    )
        .prop_map(|(amount, description, loss_type)| {
            ClaimBuilder::new()
                .with_money(amount)
                .with_description(description)
                .with_loss_type(loss_type)
                .build()
        })
}

/// Independent completion delays for the three standard specialists
pub fn specialist_delays_strategy() -> impl Strategy<Value = [Duration; 3]> {
    prop::array::uniform3(0u64..40).prop_map(|ms| ms.map(Duration::from_millis))
}

fn confidence_strategy() -> impl Strategy<Value = f64> {
    (0u32..=100).prop_map(|c| f64::from(c) / 100.0)
}

pub fn assessment_strategy() -> impl Strategy<Value = StructuredAnalysisResult> {
    (
        prop_oneof![
            Just(Validity::Valid),
            Just(Validity::Questionable),
            Just(Validity::Invalid)
        ],
        prop::collection::vec(prop::sample::select(vec!["late report", "prior claim"]), 0..3),
        confidence_strategy(),
    )
        .prop_map(|(validity, flags, confidence)| {
            StructuredAnalysisResult::Assessment(AssessmentResult {
                validity,
                cost_assessment: "Estimate reviewed".to_string(),
                red_flags: flags.into_iter().map(str::to_string).collect(),
                confidence,
            })
        })
}

pub fn coverage_strategy() -> impl Strategy<Value = StructuredAnalysisResult> {
    (
        prop_oneof![
            Just(CoverageStatus::Covered),
            Just(CoverageStatus::NotCovered),
            Just(CoverageStatus::Partial),
            Just(CoverageStatus::InsufficientEvidence)
        ],
        confidence_strategy(),
    )
        .prop_map(|(status, confidence)| {
            StructuredAnalysisResult::Coverage(CoverageResult {
                status,
                cited_sections: vec![],
                details: "Coverage reviewed".to_string(),
                confidence,
            })
        })
}

pub fn risk_strategy() -> impl Strategy<Value = StructuredAnalysisResult> {
    (
        prop_oneof![Just(RiskLevel::Low), Just(RiskLevel::Medium), Just(RiskLevel::High)],
        0u8..=100,
        prop::collection::vec(Just("inconsistent timeline".to_string()), 0..2),
        confidence_strategy(),
    )
        .prop_map(|(level, score, fraud_indicators, confidence)| {
            StructuredAnalysisResult::Risk(RiskResult {
                level,
                score,
                fraud_indicators,
                analysis: "Risk reviewed".to_string(),
                confidence,
            })
        })
}

/// Any mix of assessment, coverage and risk results, repeats allowed
pub fn specialist_results_strategy() -> impl Strategy<Value = Vec<StructuredAnalysisResult>> {
    prop::collection::vec(
        prop_oneof![assessment_strategy(), coverage_strategy(), risk_strategy()],
        0..6,
    )
}
