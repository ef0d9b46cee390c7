//! Prescription models.

use serde::{Deserialize, Serialize};

use super::{impl_entity, RecordId};
use crate::store::Collection;

/// Which eye(s) a prescribed practice applies to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Laterality {
    #[default]
    BothEyes,
    LeftEye,
    RightEye,
}

impl Laterality {
    /// Short label printed on prescriptions (AO / OI / OD).
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Laterality::BothEyes => "AO",
            Laterality::LeftEye => "OI",
            Laterality::RightEye => "OD",
        }
    }
}

/// One ordered practice inside a prescription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionItem {
    pub practice_id: RecordId,
    #[serde(default)]
    pub laterality: Laterality,
}

/// A prescription issued by a doctor for a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub patient_id: RecordId,
    pub doctor_id: RecordId,
    #[serde(default)]
    pub social_work_plan_id: Option<RecordId>,
    /// Issue date (YYYY-MM-DD)
    pub issued_on: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Ordered practices; order is preserved by the store
    #[serde(default)]
    pub items: Vec<PrescriptionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl_entity!(Prescription, Collection::Prescriptions);

impl Prescription {
    /// Create a prescription dated today.
    pub fn new(patient_id: RecordId, doctor_id: RecordId) -> Self {
        Self {
            patient_id,
            doctor_id,
            issued_on: chrono::Local::now().format("%Y-%m-%d").to_string(),
            ..Default::default()
        }
    }

    /// Append a practice for the given eye(s).
    pub fn with_item(mut self, practice_id: RecordId, laterality: Laterality) -> Self {
        self.items.push(PrescriptionItem {
            practice_id,
            laterality,
        });
        self
    }

    /// Whether any item orders the given practice.
    pub fn references_practice(&self, practice_id: RecordId) -> bool {
        self.items.iter().any(|item| item.practice_id == practice_id)
    }
}
