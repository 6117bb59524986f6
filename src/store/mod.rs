//! Persistence layer — libSQL-backed analysis history.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{AnalysisStore, StoredAnalysis};
