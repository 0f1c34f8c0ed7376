/// Scripted in-memory connection source
pub mod scripted;

pub use scripted::{
    CallStats, FailAt, RecordedBinding, Script, ScriptedSource, create_test_row, result_set,
};

/// Test utilities for `PostgreSQL` testing against an embedded server
#[cfg(feature = "test-utils-postgres")]
pub mod postgres;

#[cfg(feature = "test-utils-postgres")]
pub use postgres::*;

#[cfg(feature = "test-utils-postgres")]
use std::sync::LazyLock;
#[cfg(feature = "test-utils-postgres")]
use tokio::runtime::Runtime;

/// Shared tokio runtime for test utilities to avoid creating multiple runtimes
#[cfg(feature = "test-utils-postgres")]
pub(crate) static SHARED_RUNTIME: LazyLock<Runtime> =
    LazyLock::new(|| Runtime::new().expect("Failed to create tokio runtime for test utilities"));
