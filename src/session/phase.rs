//! Session phase state machine.

use serde::{Deserialize, Serialize};

/// The coarse progress phase of a diagnostic session.
///
/// Progresses monotonically: Questioning → ContactCollection → Completed.
/// Every operation's legality is a function of this tag, checked before
/// any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Questioning,
    ContactCollection,
    Completed,
}

impl Phase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, target),
            (Questioning, ContactCollection) | (ContactCollection, Completed)
        )
    }

    /// Whether this phase is terminal (the session is immutable).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Get the next phase in the linear progression, if any.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Self::Questioning => Some(Self::ContactCollection),
            Self::ContactCollection => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Position in the monotonic order; the store uses this to ignore
    /// backward phase writes.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Questioning => 0,
            Self::ContactCollection => 1,
            Self::Completed => 2,
        }
    }

    /// The string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Questioning => "questioning",
            Self::ContactCollection => "contact_collection",
            Self::Completed => "completed",
        }
    }

    /// Parse a database string. Unknown strings map to `None`.
    pub fn parse(s: &str) -> Option<Phase> {
        match s {
            "questioning" => Some(Self::Questioning),
            "contact_collection" => Some(Self::ContactCollection),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::Questioning
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
