//! The persistence contract the session state machine depends on.
//!
//! The engine assumes at most one in-flight mutating call per session id;
//! should the host violate that, the per-row atomic upserts below are the
//! safety net. Every write is idempotent, so external retries after a
//! write failure are always safe. No delete operations exist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::session::model::{ContactField, DiagnosticResult, SessionRecord};
use crate::session::phase::Phase;

/// Backend-agnostic durable store for sessions, answers, contacts, and
/// results.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session in phase Questioning. Idempotent: an existing
    /// session is left untouched.
    async fn create_session(&self, id: Uuid, created_at: DateTime<Utc>)
    -> Result<(), DatabaseError>;

    /// Reconstruct a session's full state — phase, answers, contacts,
    /// and result if present. This is everything resumability needs;
    /// no in-process coordinator state exists.
    async fn read_session(&self, id: Uuid) -> Result<Option<SessionRecord>, DatabaseError>;

    /// Write an answer, unique per (session, question). Re-submission
    /// overwrites in place, never duplicates.
    async fn upsert_answer(
        &self,
        id: Uuid,
        question_id: u32,
        value: i64,
        answered_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Write a contact field, unique per (session, field).
    async fn upsert_contact(
        &self,
        id: Uuid,
        field: ContactField,
        value: &str,
    ) -> Result<(), DatabaseError>;

    /// Advance a session's phase. Monotonic: a request to move the phase
    /// backward (or sideways) is ignored, never applied. Moving to
    /// Completed stamps `completed_at`.
    async fn set_phase(&self, id: Uuid, phase: Phase) -> Result<(), DatabaseError>;

    /// Persist a diagnostic result, unique per session. Idempotent.
    async fn store_result(&self, result: &DiagnosticResult) -> Result<(), DatabaseError>;
}
