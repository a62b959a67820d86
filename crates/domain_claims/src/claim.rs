//! Claim submission
//!
//! A submission is the read-only input of a workflow run. Nothing in the
//! workflow mutates it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, ImageId, Money};
use crate::error::ValidationError;

/// Type of loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    Vehicle,
    Property,
    Theft,
    Liability,
    Health,
    Travel,
    Other,
}

impl LossType {
    /// Vehicle claims ask for different supporting evidence
    pub fn is_vehicle(&self) -> bool {
        matches!(self, LossType::Vehicle)
    }
}

/// What happened, when, and where, as reported by the claimant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Incident date exactly as submitted; parsed at intake
    pub date: String,
    pub description: String,
    pub location: Option<String>,
}

/// Supporting documents the claimant says they hold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFlags {
    pub incident_report: bool,
    pub photos: bool,
    pub police_report: bool,
}

impl EvidenceFlags {
    /// Every supporting document present
    pub fn complete() -> Self {
        Self {
            incident_report: true,
            photos: true,
            police_report: true,
        }
    }

    /// Number of the three supporting documents that are missing
    pub fn missing_count(&self) -> usize {
        [self.incident_report, self.photos, self.police_report]
            .iter()
            .filter(|present| !**present)
            .count()
    }
}

/// An image attached to the claim (already ingested elsewhere)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimImage {
    pub id: ImageId,
    pub file_name: String,
    pub media_type: String,
    pub caption: Option<String>,
}

/// A claim as submitted for evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSubmission {
    pub id: ClaimId,
    pub policy_reference: String,
    pub loss_type: LossType,
    pub incident: Incident,
    pub claimed_amount: Money,
    pub evidence: EvidenceFlags,
    #[serde(default)]
    pub images: Vec<ClaimImage>,
}

impl ClaimSubmission {
    /// True when image evidence is attached
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Lower-cased description used by keyword rules
    pub fn normalized_description(&self) -> String {
        self.incident.description.to_lowercase()
    }

    /// Checks the structural invariants required before any analysis runs
    ///
    /// Returns the parsed incident date on success.
    pub fn validate_for_intake(&self, now: DateTime<Utc>) -> Result<NaiveDate, ValidationError> {
        if self.policy_reference.trim().is_empty() {
            return Err(ValidationError::new("policy_reference", "is required"));
        }
        if self.incident.description.trim().is_empty() {
            return Err(ValidationError::new("incident.description", "is required"));
        }
        if self.incident.date.trim().is_empty() {
            return Err(ValidationError::new("incident.date", "is required"));
        }

        let occurred = parse_incident_date(&self.incident.date).ok_or_else(|| {
            ValidationError::new(
                "incident.date",
                format!(
                    "'{}' is not an ISO 8601 date (expected YYYY-MM-DD)",
                    self.incident.date
                ),
            )
        })?;
        if occurred.is_after(now) {
            return Err(ValidationError::new(
                "incident.date",
                format!("{} is in the future", self.incident.date.trim()),
            ));
        }

        self.claimed_amount
            .ensure_non_negative()
            .map_err(|e| ValidationError::new("claimed_amount", e.to_string()))?;

        Ok(occurred.date())
    }
}

/// Incident time at the precision it was submitted with
#[derive(Debug, Clone, Copy)]
enum IncidentTime {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl IncidentTime {
    fn date(&self) -> NaiveDate {
        match self {
            IncidentTime::Day(date) => *date,
            IncidentTime::Instant(ts) => ts.date_naive(),
        }
    }

    /// A bare date counts as the whole day; a timestamp is compared exactly
    fn is_after(&self, now: DateTime<Utc>) -> bool {
        match self {
            IncidentTime::Day(date) => *date > now.date_naive(),
            IncidentTime::Instant(ts) => *ts > now,
        }
    }
}

/// Accepts a calendar date or a full RFC 3339 timestamp
fn parse_incident_date(raw: &str) -> Option<IncidentTime> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(IncidentTime::Day)
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|ts| IncidentTime::Instant(ts.with_timezone(&Utc)))
        })
}
