//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::call::{NUM_OF_STATUS_FIELDS, create_callable_string};
pub use crate::caller::{Caller, ProcedureCall};
pub use crate::config::CallerConfig;
pub use crate::driver::{CallConnection, ConnectionSource, PreparedCall, RowCursor};
pub use crate::error::SprocError;
pub use crate::mapper::{OutputMapper, RowMapper};
pub use crate::params;
pub use crate::results::{CustomDbRow, OutputParams, ResultSet};
pub use crate::tuple::CallTuple;
pub use crate::types::{DatabaseType, Param, ParamType, RowValues, SqlType, param_types};

#[cfg(feature = "postgres")]
pub use crate::postgres::PgSource;

#[cfg(feature = "mssql")]
pub use crate::mssql::{MssqlOptions, MssqlSource};
