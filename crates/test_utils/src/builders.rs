//! Test Data Builders
//!
//! Builders let a test state only the fields it cares about. Defaults produce
//! a claim that passes intake and classifies LOW.

use fake::faker::address::en::CityName;
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{ClaimId, Currency, ImageId, Money};
use domain_claims::{ClaimImage, ClaimSubmission, EvidenceFlags, Incident, LossType};

use crate::fixtures::ClaimFixtures;

/// Builder for claim submissions
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    id: ClaimId,
    policy_reference: String,
    loss_type: LossType,
    incident_date: String,
    description: String,
    location: Option<String>,
    amount: Money,
    evidence: EvidenceFlags,
    images: Vec<ClaimImage>,
}

impl Default for ClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimBuilder {
    pub fn new() -> Self {
        let policy_number: u32 = (100_000..999_999).fake();
        Self {
            id: ClaimId::new(),
            policy_reference: format!("POL-{policy_number}"),
            loss_type: LossType::Vehicle,
            incident_date: ClaimFixtures::incident_date().to_string(),
            description: "Dent in passenger door".to_string(),
            location: Some(CityName().fake()),
            amount: Money::new(Decimal::new(500, 0), Currency::USD),
            evidence: EvidenceFlags::complete(),
            images: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: ClaimId) -> Self {
        self.id = id;
        self
    }

    pub fn with_policy_reference(mut self, reference: impl Into<String>) -> Self {
        self.policy_reference = reference.into();
        self
    }

    pub fn with_loss_type(mut self, loss_type: LossType) -> Self {
        self.loss_type = loss_type;
        self
    }

    pub fn with_incident_date(mut self, date: impl Into<String>) -> Self {
        self.incident_date = date.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn without_location(mut self) -> Self {
        self.location = None;
        self
    }

    /// Claimed amount in USD
    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Money::new(amount, Currency::USD);
        self
    }

    pub fn with_money(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_evidence(mut self, evidence: EvidenceFlags) -> Self {
        self.evidence = evidence;
        self
    }

    /// Marks all supporting documents as absent
    pub fn without_evidence(self) -> Self {
        self.with_evidence(EvidenceFlags::default())
    }

    /// Attaches a JPEG with the given file name
    pub fn with_image(mut self, file_name: impl Into<String>) -> Self {
        self.images.push(ClaimImage {
            id: ImageId::new(),
            file_name: file_name.into(),
            media_type: "image/jpeg".to_string(),
            caption: None,
        });
        self
    }

    pub fn build(self) -> ClaimSubmission {
        ClaimSubmission {
            id: self.id,
            policy_reference: self.policy_reference,
            loss_type: self.loss_type,
            incident: Incident {
                date: self.incident_date,
                description: self.description,
                location: self.location,
            },
            claimed_amount: self.amount,
            evidence: self.evidence,
            images: self.images,
        }
    }
}
