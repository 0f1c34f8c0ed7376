//! The database collaborator a [`Caller`](crate::Caller) drives.
//!
//! A backend supplies a [`ConnectionSource`]; each call acquires one [`CallConnection`],
//! prepares one [`PreparedCall`] on it, and at most one [`RowCursor`] over its row-set.
//! Every handle is released when it is dropped, so all three are released exactly once on
//! every exit path of a call, in reverse order of acquisition.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::error::SprocError;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::{DatabaseType, RowValues, SqlType};

/// Hands out connections, either from a pool or by opening one with stored credentials.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn CallConnection>, SprocError>;

    /// Backend name for logs; `None` for sources that are not tied to a real database.
    fn database_type(&self) -> Option<DatabaseType> {
        None
    }
}

#[async_trait]
pub trait CallConnection: Send {
    /// Prepare a `{call name(?,…)}` statement.
    async fn prepare_call<'a>(
        &'a mut self,
        sql: &str,
    ) -> Result<Box<dyn PreparedCall + 'a>, SprocError>;
}

/// A prepared procedure call with positional (1-based) parameters.
#[async_trait]
pub trait PreparedCall: Send {
    fn set_input(
        &mut self,
        index: usize,
        value: &RowValues,
        sql_type: SqlType,
    ) -> Result<(), SprocError>;

    fn register_output(&mut self, index: usize, sql_type: SqlType) -> Result<(), SprocError>;

    /// Run the statement. Returns whether the procedure produced a row-set.
    async fn execute(&mut self) -> Result<bool, SprocError>;

    async fn result_set<'a>(&'a mut self) -> Result<Box<dyn RowCursor + 'a>, SprocError>;

    /// Value of a registered output parameter after `execute`.
    fn output(&self, index: usize) -> Result<RowValues, SprocError>;
}

#[async_trait]
pub trait RowCursor: Send {
    async fn next_row(&mut self) -> Result<Option<CustomDbRow>, SprocError>;
}

/// Cursor over a row-set the backend has already materialized.
#[derive(Debug, Default)]
pub struct BufferedRows {
    rows: VecDeque<CustomDbRow>,
}

impl BufferedRows {
    #[must_use]
    pub fn new(result_set: ResultSet) -> Self {
        Self {
            rows: result_set.results.into(),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl RowCursor for BufferedRows {
    async fn next_row(&mut self) -> Result<Option<CustomDbRow>, SprocError> {
        Ok(self.rows.pop_front())
    }
}

/// Look up an output value a backend captured after execution.
pub(crate) fn captured_output(
    outputs: &std::collections::BTreeMap<usize, RowValues>,
    index: usize,
) -> Result<RowValues, SprocError> {
    outputs.get(&index).cloned().ok_or_else(|| {
        SprocError::ParameterError(format!("no output parameter registered at position {index}"))
    })
}
