//! Stage Diagnostic — business-lifecycle diagnostic engine.
//!
//! Assigns an Adizes lifecycle stage to a respondent from a fixed
//! questionnaire: immutable reference data, pure scoring and
//! classification, and a resumable session state machine over a durable
//! store.

pub mod config;
pub mod error;
pub mod reference;
pub mod scoring;
pub mod session;
pub mod store;
