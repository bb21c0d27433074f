//! Session state machine: phases, durable records, and the engine API.

pub mod engine;
pub mod model;
pub mod phase;
pub mod view;

pub use engine::DiagnosticEngine;
pub use model::{ContactField, DiagnosticResult, SessionRecord};
pub use phase::Phase;
pub use view::SessionView;
