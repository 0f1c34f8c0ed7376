// MSSQL module - runs procedure calls through tiberius
//
// This module is split into several sub-modules:
// - config: Connection options and sources (direct or deadpool-tiberius pool)
// - params: Typed binding of inputs and declared types of outputs
// - query: Result-set collection and value extraction
// - executor: The prepared-call implementation

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{MssqlClient, MssqlOptions, MssqlSource, create_mssql_client};
pub use executor::{MssqlConnection, MssqlPreparedCall};
pub use params::declared_type;
pub use query::extract_value;
