//! Practice models.

use serde::{Deserialize, Serialize};

use super::{impl_entity, RecordId};
use crate::store::Collection;

/// A billable ophthalmic practice (exam, procedure) that prescriptions order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Practice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Nomenclator code
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl_entity!(Practice, Collection::Practices);

impl Practice {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}
