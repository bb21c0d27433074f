//! Session domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::reference::{INDEX_COUNT, ReferenceData};
use crate::session::phase::Phase;

/// A contact field collected after the questionnaire. Name and revenue
/// range are required for completion; the share opt-in is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Name,
    RevenueRange,
    ShareOptIn,
}

impl ContactField {
    /// The fields that must be present before a session can complete.
    pub const REQUIRED: [ContactField; 2] = [Self::Name, Self::RevenueRange];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::RevenueRange => "revenue_range",
            Self::ShareOptIn => "share_opt_in",
        }
    }
}

impl std::str::FromStr for ContactField {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "revenue_range" | "revenue-range" => Ok(Self::RevenueRange),
            "share_opt_in" | "share-opt-in" => Ok(Self::ShareOptIn),
            other => Err(EngineError::UnknownContactField(other.to_string())),
        }
    }
}

impl std::fmt::Display for ContactField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The durable diagnostic of a completed session. Always a pure
/// derivation of the session's answers — recomputable, never hand-edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub session_id: Uuid,
    pub stage_id: String,
    /// Index values positionally aligned with [`ReferenceData::indices`].
    pub indices: [f64; INDEX_COUNT],
    pub computed_at: DateTime<Utc>,
}

/// A session's full durable state, as reconstructed from the store.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Question id → answer value. At most one answer per question.
    pub answers: BTreeMap<u32, i64>,
    pub contacts: BTreeMap<ContactField, String>,
    pub result: Option<DiagnosticResult>,
}

impl SessionRecord {
    pub fn new(id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            phase: Phase::Questioning,
            created_at,
            completed_at: None,
            answers: BTreeMap::new(),
            contacts: BTreeMap::new(),
            result: None,
        }
    }

    /// The lowest-numbered unanswered question id, derived from the
    /// answered set. Never stored, so it cannot desynchronize from the
    /// answers themselves.
    pub fn next_question_id(&self, reference: &ReferenceData) -> Option<u32> {
        reference
            .question_ids()
            .find(|id| !self.answers.contains_key(id))
    }

    /// Whether every question in the reference set has an answer.
    pub fn is_fully_answered(&self, reference: &ReferenceData) -> bool {
        reference
            .question_ids()
            .all(|id| self.answers.contains_key(&id))
    }

    /// Count of answered questions (capped at the reference set).
    pub fn answered_count(&self, reference: &ReferenceData) -> usize {
        reference
            .question_ids()
            .filter(|id| self.answers.contains_key(id))
            .count()
    }

    /// Whether both required contact fields are present.
    pub fn has_required_contacts(&self) -> bool {
        ContactField::REQUIRED
            .iter()
            .all(|field| self.contacts.contains_key(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceData;

    #[test]
    fn contact_field_parses_both_spellings() {
        assert_eq!("name".parse::<ContactField>().ok(), Some(ContactField::Name));
        assert_eq!(
            "revenue_range".parse::<ContactField>().ok(),
            Some(ContactField::RevenueRange)
        );
        assert_eq!(
            "revenue-range".parse::<ContactField>().ok(),
            Some(ContactField::RevenueRange)
        );
        assert_eq!(
            "share-opt-in".parse::<ContactField>().ok(),
            Some(ContactField::ShareOptIn)
        );
        assert!(matches!(
            "email".parse::<ContactField>(),
            Err(EngineError::UnknownContactField(f)) if f == "email"
        ));
    }

    #[test]
    fn next_question_is_lowest_unanswered() {
        let reference = ReferenceData::builtin().expect("built-in dataset");
        let mut record = SessionRecord::new(Uuid::new_v4(), Utc::now());
        assert_eq!(record.next_question_id(&reference), Some(1));

        // Answer out of order; the derived pointer tracks the lowest gap.
        record.answers.insert(1, 3);
        record.answers.insert(2, 3);
        record.answers.insert(5, 3);
        assert_eq!(record.next_question_id(&reference), Some(3));

        for id in reference.question_ids() {
            record.answers.insert(id, 3);
        }
        assert_eq!(record.next_question_id(&reference), None);
        assert!(record.is_fully_answered(&reference));
    }

    #[test]
    fn required_contacts() {
        let mut record = SessionRecord::new(Uuid::new_v4(), Utc::now());
        assert!(!record.has_required_contacts());
        record
            .contacts
            .insert(ContactField::Name, "Acme".to_string());
        assert!(!record.has_required_contacts());
        record
            .contacts
            .insert(ContactField::ShareOptIn, "yes".to_string());
        assert!(!record.has_required_contacts());
        record
            .contacts
            .insert(ContactField::RevenueRange, "1M-5M".to_string());
        assert!(record.has_required_contacts());
    }
}
