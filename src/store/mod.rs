//! Persistence layer: libSQL-backed storage for pages, sessions and reference data.

pub mod libsql_backend;
pub mod migrations;
pub mod seed;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use seed::{SeedData, load_seed};
pub use traits::WizardStore;
