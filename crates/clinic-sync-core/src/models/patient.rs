//! Patient models.

use serde::{Deserialize, Serialize};

use super::{impl_entity, RecordId};
use crate::store::Collection;

/// A patient record.
///
/// Patients are the one collection expected to grow without bound, so the
/// client never bulk-loads them; see [`crate::search::PatientSearch`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Server ID - `None` until the store accepts the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub first_name: String,
    pub last_name: String,
    /// National identity document number
    pub document_number: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Affiliation organization (social work) name, e.g. "OSDE"
    #[serde(default)]
    pub social_work: Option<String>,
    /// Member number within the affiliation organization
    #[serde(default)]
    pub affiliation_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Set by the store on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl_entity!(Patient, Collection::Patients);

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, document_number: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            document_number: document_number.into(),
            ..Default::default()
        }
    }

    /// Set the affiliation organization and member number.
    pub fn with_affiliation(mut self, social_work: impl Into<String>, number: impl Into<String>) -> Self {
        self.social_work = Some(social_work.into());
        self.affiliation_number = Some(number.into());
        self
    }

    /// "Last, First" as shown in listings.
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }

    /// Ordering key used for result pages: last name, first name, id.
    pub(crate) fn sort_key(&self) -> (String, String, RecordId) {
        (
            self.last_name.to_ascii_lowercase(),
            self.first_name.to_ascii_lowercase(),
            self.id.unwrap_or(RecordId::MAX),
        )
    }
}
