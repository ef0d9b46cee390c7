//! Signed-in session and actor identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies who caused a change at the store boundary.
///
/// The store stamps every mutation with the acting session's id, and the same
/// id comes back on the realtime change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Staff role of the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Secretary,
    /// Clinician role; never receives concurrent-edit notices
    Doctor,
}

impl Role {
    /// Whether users with this role get realtime change notices.
    pub fn receives_notifications(&self) -> bool {
        !matches!(self, Role::Doctor)
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub actor: ActorId,
    pub user_name: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_name: impl Into<String>, role: Role) -> Self {
        Self {
            actor: ActorId::new(),
            user_name: user_name.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_gating() {
        assert!(Role::Admin.receives_notifications());
        assert!(Role::Secretary.receives_notifications());
        assert!(!Role::Doctor.receives_notifications());
    }

    #[test]
    fn test_sessions_get_distinct_actors() {
        let a = Session::new("ana", Role::Admin);
        let b = Session::new("ana", Role::Admin);
        assert_ne!(a.actor, b.actor);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Secretary).unwrap();
        assert_eq!(json, "\"secretary\"");
    }
}
