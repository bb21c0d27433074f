//! The session snapshot exposed to the transport layer.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::reference::ReferenceData;
use crate::session::model::{ContactField, SessionRecord};
use crate::session::phase::Phase;

/// What the transport layer needs to drive one user action: the phase,
/// progress, the derived next question, and the contacts collected so far.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub phase: Phase,
    pub answered: usize,
    pub total_questions: usize,
    /// Lowest unanswered question id; `None` once questioning is done.
    pub next_question_id: Option<u32>,
    pub contacts: BTreeMap<ContactField, String>,
}

impl SessionView {
    pub fn from_record(record: &SessionRecord, reference: &ReferenceData) -> Self {
        Self {
            id: record.id,
            phase: record.phase,
            answered: record.answered_count(reference),
            total_questions: reference.question_count(),
            next_question_id: record.next_question_id(reference),
            contacts: record.contacts.clone(),
        }
    }
}
