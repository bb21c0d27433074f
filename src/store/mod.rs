//! Persistence layer — durable session storage behind the
//! [`SessionStore`] contract.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::SessionStore;
