//! Pure scoring: answer aggregation and stage classification.
//!
//! Nothing in this module touches the store or suspends — both functions
//! are deterministic over their inputs, so a diagnostic can be recomputed
//! at any time from a session's answers alone.

pub mod aggregator;
pub mod classifier;

pub use aggregator::{Scores, aggregate};
pub use classifier::classify;
