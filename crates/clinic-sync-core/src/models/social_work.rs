//! Social work (health insurance organization) models.

use serde::{Deserialize, Serialize};

use super::{impl_entity, RecordId};
use crate::store::Collection;

/// A social work, i.e. a health insurance organization patients are affiliated to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SocialWork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl_entity!(SocialWork, Collection::SocialWorks);

impl SocialWork {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A coverage plan offered by a social work.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SocialWorkPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Owning social work
    pub social_work_id: RecordId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl_entity!(SocialWorkPlan, Collection::SocialWorkPlans);

impl SocialWorkPlan {
    pub fn new(social_work_id: RecordId, name: impl Into<String>) -> Self {
        Self {
            social_work_id,
            name: name.into(),
            ..Default::default()
        }
    }
}
