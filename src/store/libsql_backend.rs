//! libSQL backend — async [`SessionStore`] implementation.
//!
//! Supports local file and in-memory databases. All timestamps are stored
//! as RFC 3339 text; phase monotonicity is enforced inside the `UPDATE`
//! statement itself, so a backward phase write affects zero rows no
//! matter what the caller does.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::reference::INDEX_COUNT;
use crate::session::model::{ContactField, DiagnosticResult, SessionRecord};
use crate::session::phase::Phase;
use crate::store::migrations;
use crate::store::traits::SessionStore;

/// libSQL session store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Session database opened");
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 datetime string (our canonical write format).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

/// SQL expression mapping a phase string to its monotonic rank.
const PHASE_RANK: &str =
    "CASE ? WHEN 'questioning' THEN 0 WHEN 'contact_collection' THEN 1 WHEN 'completed' THEN 2 ELSE -1 END";

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl SessionStore for LibSqlStore {
    async fn create_session(
        &self,
        id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let inserted = self
            .conn()
            .execute(
                "INSERT INTO sessions (id, phase, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (id) DO NOTHING",
                params![
                    id.to_string(),
                    Phase::Questioning.as_str(),
                    created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_session: {e}")))?;

        if inserted > 0 {
            debug!(session = %id, "Session created");
        }
        Ok(())
    }

    async fn read_session(&self, id: Uuid) -> Result<Option<SessionRecord>, DatabaseError> {
        let conn = self.conn();
        let sid = id.to_string();

        let mut rows = conn
            .query(
                "SELECT phase, created_at, completed_at FROM sessions WHERE id = ?1",
                params![sid.clone()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("read_session: {e}")))?;

        let mut record = match rows.next().await {
            Ok(Some(row)) => {
                let phase_str: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("read_session phase: {e}")))?;
                let created_str: String = row
                    .get(1)
                    .map_err(|e| DatabaseError::Query(format!("read_session created_at: {e}")))?;
                let completed_str: Option<String> = row.get(2).ok();

                let phase = match Phase::parse(&phase_str) {
                    Some(p) => p,
                    None => {
                        warn!(session = %id, phase = %phase_str, "Unknown phase in store, treating as questioning");
                        Phase::Questioning
                    }
                };
                let mut record = SessionRecord::new(id, parse_datetime(&created_str));
                record.phase = phase;
                record.completed_at = parse_optional_datetime(&completed_str);
                record
            }
            Ok(None) => return Ok(None),
            Err(e) => return Err(DatabaseError::Query(format!("read_session: {e}"))),
        };

        let mut rows = conn
            .query(
                "SELECT question_id, value FROM answers WHERE session_id = ?1",
                params![sid.clone()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("read_session answers: {e}")))?;
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("read_session answers: {e}")))?
        {
            // A row that does not decode is corruption, not a default;
            // fabricating value 0 here would silently skew the scoring.
            let question_id: i64 = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("read_session answer id: {e}")))?;
            let value: i64 = row
                .get(1)
                .map_err(|e| DatabaseError::Query(format!("read_session answer value: {e}")))?;
            if question_id < 0 {
                return Err(DatabaseError::Query(format!(
                    "read_session answer id: negative question id {question_id}"
                )));
            }
            record.answers.insert(question_id as u32, value);
        }

        let mut rows = conn
            .query(
                "SELECT field, value FROM contacts WHERE session_id = ?1",
                params![sid.clone()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("read_session contacts: {e}")))?;
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("read_session contacts: {e}")))?
        {
            let field_str: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("read_session contact field: {e}")))?;
            let value: String = row
                .get(1)
                .map_err(|e| DatabaseError::Query(format!("read_session contact value: {e}")))?;
            match field_str.parse::<ContactField>() {
                Ok(field) => {
                    record.contacts.insert(field, value);
                }
                Err(_) => warn!(session = %id, field = %field_str, "Skipping unknown contact field"),
            }
        }

        let mut rows = conn
            .query(
                "SELECT stage_id, index_1, index_2, index_3, computed_at
                 FROM results WHERE session_id = ?1",
                params![sid],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("read_session result: {e}")))?;
        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("read_session result: {e}")))?
        {
            let stage_id: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("read_session result stage: {e}")))?;
            let mut indices = [0.0; INDEX_COUNT];
            for (i, slot) in indices.iter_mut().enumerate() {
                *slot = row.get::<f64>((i + 1) as i32).map_err(|e| {
                    DatabaseError::Query(format!("read_session result index_{}: {e}", i + 1))
                })?;
            }
            let computed_str: String = row
                .get(4)
                .map_err(|e| DatabaseError::Query(format!("read_session result computed_at: {e}")))?;
            record.result = Some(DiagnosticResult {
                session_id: id,
                stage_id,
                indices,
                computed_at: parse_datetime(&computed_str),
            });
        }

        Ok(Some(record))
    }

    async fn upsert_answer(
        &self,
        id: Uuid,
        question_id: u32,
        value: i64,
        answered_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO answers (session_id, question_id, value, answered_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (session_id, question_id) DO UPDATE SET
                   value = excluded.value,
                   answered_at = excluded.answered_at",
                params![
                    id.to_string(),
                    question_id as i64,
                    value,
                    answered_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_answer: {e}")))?;
        Ok(())
    }

    async fn upsert_contact(
        &self,
        id: Uuid,
        field: ContactField,
        value: &str,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO contacts (session_id, field, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (session_id, field) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                params![
                    id.to_string(),
                    field.as_str(),
                    value,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_contact: {e}")))?;
        Ok(())
    }

    async fn set_phase(&self, id: Uuid, phase: Phase) -> Result<(), DatabaseError> {
        // The WHERE clause compares monotonic ranks, so backward or
        // sideways requests update zero rows and are silently ignored.
        let sql = format!(
            "UPDATE sessions SET
               phase = ?1,
               completed_at = CASE
                 WHEN ?1 = 'completed' AND completed_at IS NULL THEN ?2
                 ELSE completed_at
               END
             WHERE id = ?3
               AND ({rank_current}) < ({rank_target})",
            rank_current = PHASE_RANK.replacen('?', "phase", 1),
            rank_target = PHASE_RANK.replacen('?', "?1", 1),
        );
        let updated = self
            .conn()
            .execute(
                &sql,
                params![phase.as_str(), Utc::now().to_rfc3339(), id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_phase: {e}")))?;

        if updated > 0 {
            debug!(session = %id, phase = %phase, "Phase advanced");
        } else {
            debug!(session = %id, phase = %phase, "Phase write ignored (not a forward transition)");
        }
        Ok(())
    }

    async fn store_result(&self, result: &DiagnosticResult) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO results (session_id, stage_id, index_1, index_2, index_3, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (session_id) DO UPDATE SET
                   stage_id = excluded.stage_id,
                   index_1 = excluded.index_1,
                   index_2 = excluded.index_2,
                   index_3 = excluded.index_3,
                   computed_at = excluded.computed_at",
                params![
                    result.session_id.to_string(),
                    result.stage_id.clone(),
                    result.indices[0],
                    result.indices[1],
                    result.indices[2],
                    result.computed_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("store_result: {e}")))?;

        debug!(session = %result.session_id, stage = %result.stage_id, "Result stored");
        Ok(())
    }
}
