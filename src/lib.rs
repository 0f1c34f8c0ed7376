//! Async stored-procedure calls.
//!
//! A [`Caller`] builds `{call name(?,?,…)}` for a procedure, binds typed inputs, registers
//! typed outputs, runs it against a [`ConnectionSource`], and maps what comes back: the
//! row-set through a [`RowMapper`], the output parameters through an [`OutputMapper`].
//!
//! By default every call carries two extra trailing outputs, a status code and a status
//! message. A code other than the configured success code fails the call with
//! [`SprocError::Status`]; see [`CallerConfig`] to change or disable this.
//!
//! Backends live behind features: `postgres` (default, tokio-postgres and deadpool-postgres)
//! and `mssql` (tiberius and deadpool-tiberius). `test-utils` adds an in-memory
//! [`ScriptedSource`](crate::test_utils::ScriptedSource) for tests.

pub mod prelude;

pub mod call;
pub mod caller;
pub mod config;
pub mod driver;
pub mod error;
pub mod mapper;
pub mod results;
pub mod translation;
pub mod tuple;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mssql")]
pub mod mssql;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use call::{CallLayout, CallPlan, NUM_OF_STATUS_FIELDS, create_callable_string};
pub use caller::{Caller, ProcedureCall};
pub use config::CallerConfig;
pub use driver::{BufferedRows, CallConnection, ConnectionSource, PreparedCall, RowCursor};
pub use error::SprocError;
pub use mapper::{OutputMapper, RowMapper};
pub use results::{CustomDbRow, OutputParams, ResultSet};
pub use tuple::CallTuple;
pub use types::{DatabaseType, Param, ParamType, RowValues, SqlType, param_types};
