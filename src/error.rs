//! Error types for the diagnostic engine.

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reference data error: {0}")]
    ReferenceData(#[from] ReferenceDataError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reference-data load/validation errors. All of these are fatal at
/// startup: the engine never serves sessions on partial reference data.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceDataError {
    #[error("Failed to read reference data from {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse reference data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No questions defined")]
    NoQuestions,

    #[error("Duplicate question id {0}")]
    DuplicateQuestionId(u32),

    #[error("Question {id} has a degenerate answer scale {min}..={max}")]
    DegenerateScale { id: u32, min: i64, max: i64 },

    #[error("Question {id} has no dimension weights")]
    UnweightedQuestion { id: u32 },

    #[error("Question {question} references unknown dimension {dimension}")]
    UnknownDimension { question: u32, dimension: String },

    #[error("Duplicate dimension id {0}")]
    DuplicateDimensionId(String),

    #[error("Dimension {0} is not fed by any question")]
    EmptyDimension(String),

    #[error("Dimension {0} has zero theoretical score span")]
    ZeroSpanDimension(String),

    #[error("Expected exactly {expected} indices, found {found}")]
    IndexCount { expected: usize, found: usize },

    #[error("Duplicate index id {0}")]
    DuplicateIndexId(String),

    #[error("Index {index} references unknown dimension {dimension}")]
    IndexUnknownDimension { index: String, dimension: String },

    #[error("Index {0} has zero theoretical score span")]
    ZeroSpanIndex(String),

    #[error("No stages defined")]
    NoStages,

    #[error("Duplicate stage id {0}")]
    DuplicateStageId(String),

    #[error("Stage {stage} references unknown index {index}")]
    StageUnknownIndex { stage: String, index: String },

    #[error("Stage {stage} has an empty range for index {index}")]
    EmptyStageRange { stage: String, index: String },
}

/// Per-call engine errors, returned to the transport layer as typed
/// results — never swallowed or defaulted.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Unknown question id {0}")]
    UnknownQuestionId(u32),

    #[error("Value {value} is outside the scale {min}..={max} of question {question}")]
    InvalidAnswerValue {
        question: u32,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Unknown contact field: {0}")]
    UnknownContactField(String),

    #[error("Only {answered} of {total} questions answered")]
    IncompleteSession { answered: usize, total: usize },

    #[error("Operation {operation} is not valid while session {session} is in phase {phase}")]
    WrongPhase {
        session: Uuid,
        phase: String,
        operation: &'static str,
    },

    #[error("Session {0} is completed and can no longer be modified")]
    SessionClosed(Uuid),

    #[error("Session {0} has no diagnostic result yet")]
    ResultNotReady(Uuid),
}

/// Database-related errors (the persistence-write-failure class).
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
