// PostgreSQL module - runs procedure calls through tokio-postgres
//
// This module is split into several sub-modules:
// - config: Connection sources (deadpool pool or direct credentials)
// - params: Parameter conversion between `RowValues` and PostgreSQL types
// - query: Value extraction from returned rows
// - executor: The prepared-call implementation

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::PgSource;
pub use executor::{PgConnection, PgPreparedCall};
pub use params::pg_cast;
pub use query::extract_value;
