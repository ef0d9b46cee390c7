//! Notification categories and their stale flags.

use serde::{Deserialize, Serialize};

use crate::store::{ChangeKind, Collection};

/// Kinds of concurrent change a user is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    NewPrescriptions,
    UpdatedPrescriptions,
    NewPatients,
    NewDoctors,
    NewPractices,
    NewSocialWorks,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 6] = [
        NotificationCategory::NewPrescriptions,
        NotificationCategory::UpdatedPrescriptions,
        NotificationCategory::NewPatients,
        NotificationCategory::NewDoctors,
        NotificationCategory::NewPractices,
        NotificationCategory::NewSocialWorks,
    ];

    /// Change feed that raises this category.
    pub fn watched(&self) -> (Collection, ChangeKind) {
        match self {
            NotificationCategory::NewPrescriptions => (Collection::Prescriptions, ChangeKind::Insert),
            NotificationCategory::UpdatedPrescriptions => {
                (Collection::Prescriptions, ChangeKind::Update)
            }
            NotificationCategory::NewPatients => (Collection::Patients, ChangeKind::Insert),
            NotificationCategory::NewDoctors => (Collection::Doctors, ChangeKind::Insert),
            NotificationCategory::NewPractices => (Collection::Practices, ChangeKind::Insert),
            NotificationCategory::NewSocialWorks => (Collection::SocialWorks, ChangeKind::Insert),
        }
    }

    pub fn for_change(collection: Collection, kind: ChangeKind) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.watched() == (collection, kind))
    }
}

/// One boolean per category. Set by foreign changes, cleared only on request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFlags {
    pub new_prescriptions: bool,
    pub updated_prescriptions: bool,
    pub new_patients: bool,
    pub new_doctors: bool,
    pub new_practices: bool,
    pub new_social_works: bool,
}

impl NotificationFlags {
    pub fn get(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::NewPrescriptions => self.new_prescriptions,
            NotificationCategory::UpdatedPrescriptions => self.updated_prescriptions,
            NotificationCategory::NewPatients => self.new_patients,
            NotificationCategory::NewDoctors => self.new_doctors,
            NotificationCategory::NewPractices => self.new_practices,
            NotificationCategory::NewSocialWorks => self.new_social_works,
        }
    }

    pub(crate) fn set(&mut self, category: NotificationCategory, value: bool) {
        let slot = match category {
            NotificationCategory::NewPrescriptions => &mut self.new_prescriptions,
            NotificationCategory::UpdatedPrescriptions => &mut self.updated_prescriptions,
            NotificationCategory::NewPatients => &mut self.new_patients,
            NotificationCategory::NewDoctors => &mut self.new_doctors,
            NotificationCategory::NewPractices => &mut self.new_practices,
            NotificationCategory::NewSocialWorks => &mut self.new_social_works,
        };
        *slot = value;
    }

    /// Whether the banner should show.
    pub fn any(&self) -> bool {
        NotificationCategory::ALL.iter().any(|c| self.get(*c))
    }

    /// Categories currently raised.
    pub fn raised(&self) -> Vec<NotificationCategory> {
        NotificationCategory::ALL
            .into_iter()
            .filter(|c| self.get(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_distinct_feed() {
        for category in NotificationCategory::ALL {
            let (collection, kind) = category.watched();
            assert_eq!(NotificationCategory::for_change(collection, kind), Some(category));
        }
        assert_eq!(
            NotificationCategory::for_change(Collection::Patients, ChangeKind::Delete),
            None
        );
    }

    #[test]
    fn test_flags_set_and_any() {
        let mut flags = NotificationFlags::default();
        assert!(!flags.any());

        flags.set(NotificationCategory::NewDoctors, true);
        assert!(flags.any());
        assert!(flags.get(NotificationCategory::NewDoctors));
        assert_eq!(flags.raised(), vec![NotificationCategory::NewDoctors]);
    }
}
