//! Doctor models.

use serde::{Deserialize, Serialize};

use super::{impl_entity, RecordId};
use crate::store::Collection;

/// A prescribing doctor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub first_name: String,
    pub last_name: String,
    /// Medical license number
    pub license_number: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl_entity!(Doctor, Collection::Doctors);

impl Doctor {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, license_number: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            license_number: license_number.into(),
            ..Default::default()
        }
    }
}
