//! DiagnosticEngine — the session state machine behind the engine API.
//!
//! Holds no per-session state in memory: every operation re-reads durable
//! state, validates against the current phase, then writes through the
//! store. A failed write therefore never leaves a partially-applied
//! answer, and retries are safe because all writes are idempotent upserts.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::reference::ReferenceData;
use crate::scoring::{aggregate, classify};
use crate::session::model::{ContactField, DiagnosticResult, SessionRecord};
use crate::session::phase::Phase;
use crate::session::view::SessionView;
use crate::store::SessionStore;

/// The diagnostic engine consumed by the transport layer.
pub struct DiagnosticEngine {
    reference: Arc<ReferenceData>,
    store: Arc<dyn SessionStore>,
}

impl DiagnosticEngine {
    pub fn new(reference: Arc<ReferenceData>, store: Arc<dyn SessionStore>) -> Self {
        Self { reference, store }
    }

    /// The immutable reference data, for transports that render prompts
    /// and stage descriptions.
    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Get or create a session. Idempotent: an existing session of any
    /// phase is returned as-is, which is how a restarted transport
    /// resumes a respondent mid-questionnaire.
    pub async fn start_session(&self, id: Uuid) -> Result<SessionView> {
        self.store.create_session(id, Utc::now()).await?;
        let record = self.load(id).await?;
        debug!(session = %id, phase = %record.phase, "Session opened");
        Ok(SessionView::from_record(&record, &self.reference))
    }

    /// Record (or correct) an answer. Legal only while Questioning.
    ///
    /// Overwriting an already-answered question is a correction: it does
    /// not change phase and does not count as new progress. The moment
    /// every question id has an answer, the session advances to
    /// ContactCollection within this same call.
    pub async fn record_answer(&self, id: Uuid, question_id: u32, value: i64) -> Result<SessionView> {
        let mut record = self.load(id).await?;
        match record.phase {
            Phase::Questioning => {}
            Phase::ContactCollection => {
                return Err(EngineError::WrongPhase {
                    session: id,
                    phase: record.phase.to_string(),
                    operation: "record_answer",
                }
                .into());
            }
            Phase::Completed => return Err(EngineError::SessionClosed(id).into()),
        }

        let question = self
            .reference
            .question(question_id)
            .ok_or(EngineError::UnknownQuestionId(question_id))?;
        if !question.scale.contains(value) {
            return Err(EngineError::InvalidAnswerValue {
                question: question_id,
                value,
                min: question.scale.min,
                max: question.scale.max,
            }
            .into());
        }

        self.store
            .upsert_answer(id, question_id, value, Utc::now())
            .await?;
        let corrected = record.answers.insert(question_id, value).is_some();
        debug!(
            session = %id,
            question = question_id,
            value,
            corrected,
            "Answer recorded"
        );

        if record.is_fully_answered(&self.reference) {
            self.store.set_phase(id, Phase::ContactCollection).await?;
            record.phase = Phase::ContactCollection;
            info!(session = %id, "Questionnaire complete, collecting contact details");
        }

        Ok(SessionView::from_record(&record, &self.reference))
    }

    /// Record a contact field. Required fields are legal only while
    /// ContactCollection; the optional share opt-in is also accepted
    /// after completion. Once both required fields are present, the
    /// session is diagnosed and completed within this call.
    pub async fn record_contact(&self, id: Uuid, field: &str, value: &str) -> Result<SessionView> {
        let field: ContactField = field.parse()?;
        let mut record = self.load(id).await?;
        match (record.phase, field) {
            (Phase::ContactCollection, _) => {}
            (Phase::Completed, ContactField::ShareOptIn) => {}
            (Phase::Completed, _) => return Err(EngineError::SessionClosed(id).into()),
            (Phase::Questioning, _) => {
                return Err(EngineError::WrongPhase {
                    session: id,
                    phase: record.phase.to_string(),
                    operation: "record_contact",
                }
                .into());
            }
        }

        self.store.upsert_contact(id, field, value).await?;
        record.contacts.insert(field, value.to_string());
        debug!(session = %id, field = %field, "Contact field recorded");

        if record.phase == Phase::ContactCollection && record.has_required_contacts() {
            self.complete(&mut record).await?;
        }

        Ok(SessionView::from_record(&record, &self.reference))
    }

    /// Return the persisted diagnostic of a completed session. Never
    /// recomputes — though recomputation would yield the same values.
    pub async fn get_result(&self, id: Uuid) -> Result<DiagnosticResult> {
        let record = self.load(id).await?;
        if record.phase != Phase::Completed {
            return Err(EngineError::ResultNotReady(id).into());
        }
        match record.result {
            Some(result) => Ok(result),
            None => {
                // Completed sessions always persist their result first;
                // a missing row is a store defect, not a caller error.
                error!(session = %id, "Completed session has no stored result");
                Err(EngineError::ResultNotReady(id).into())
            }
        }
    }

    async fn load(&self, id: Uuid) -> Result<SessionRecord> {
        let mut record = self
            .store
            .read_session(id)
            .await?
            .ok_or(EngineError::SessionNotFound(id))?;

        // A crash between the final answer write and the phase advance
        // persists a fully answered Questioning session, which no
        // operation could otherwise move forward. Heal it here: the
        // phase write is idempotent and monotonic, so replaying it on
        // every load is safe.
        if record.phase == Phase::Questioning && record.is_fully_answered(&self.reference) {
            self.store.set_phase(id, Phase::ContactCollection).await?;
            record.phase = Phase::ContactCollection;
            info!(session = %id, "Recovered fully answered session into contact collection");
        }

        Ok(record)
    }

    /// Diagnose and close a session whose answers and required contacts
    /// are all present. The result is durable before the phase flips, so
    /// a crash in between leaves a resumable ContactCollection session,
    /// never a Completed one without a result.
    async fn complete(&self, record: &mut SessionRecord) -> Result<()> {
        let scores = aggregate(&self.reference, &record.answers).inspect_err(|e| {
            // Phase ContactCollection implies a complete answer set;
            // failing here means the reference data changed underneath us.
            error!(session = %record.id, error = %e, "Aggregation failed for completion-eligible session");
        })?;
        let stage = classify(&self.reference, &scores.indices);
        let result = DiagnosticResult {
            session_id: record.id,
            stage_id: stage.id.clone(),
            indices: scores.indices,
            computed_at: Utc::now(),
        };

        self.store.store_result(&result).await?;
        self.store.set_phase(record.id, Phase::Completed).await?;
        info!(
            session = %record.id,
            stage = %result.stage_id,
            indices = ?result.indices,
            "Session diagnosed and completed"
        );

        record.phase = Phase::Completed;
        record.completed_at = Some(result.computed_at);
        record.result = Some(result);
        Ok(())
    }
}
