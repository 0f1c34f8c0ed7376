//! An in-memory [`ConnectionSource`] that plays back a scripted result and records
//! everything the caller did to it.
//!
//! ```rust
//! use sproc_middleware::prelude::*;
//! use sproc_middleware::test_utils::{Script, ScriptedSource};
//!
//! let source = ScriptedSource::new(Script::new().with_status(1, "duplicate key"));
//! let stats = source.stats();
//! let caller = Caller::new(source, CallerConfig::default());
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let err = rt.block_on(caller.call("save_user")).unwrap_err();
//! assert_eq!(err.status(), Some((1, "duplicate key")));
//! assert_eq!(stats.connections_released(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::driver::{CallConnection, ConnectionSource, PreparedCall, RowCursor, captured_output};
use crate::error::SprocError;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::{RowValues, SqlType};

/// Create a row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> CustomDbRow {
    CustomDbRow::new(Arc::new(column_names), values)
}

/// Build a row-set from column names and row values.
#[must_use]
pub fn result_set(columns: &[&str], rows: Vec<Vec<RowValues>>) -> ResultSet {
    let mut set = ResultSet::with_capacity(rows.len());
    set.set_column_names(Arc::new(columns.iter().map(|c| (*c).to_string()).collect()));
    for row in rows {
        set.add_row_values(row);
    }
    set
}

/// Where a scripted call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Acquire,
    Prepare,
    Bind,
    Execute,
    ResultSet,
    /// Fail when the cursor is asked for row `n` (0-based).
    Row(usize),
}

/// What the scripted database does when a call executes.
///
/// Declared outputs are handed out in registration order. If exactly two registered slots
/// remain after them, they receive the status pair.
#[derive(Debug, Clone)]
pub struct Script {
    rows: Option<ResultSet>,
    outputs: Vec<RowValues>,
    status: (RowValues, RowValues),
    fail_at: Option<FailAt>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            rows: None,
            outputs: Vec::new(),
            status: (RowValues::Bool(false), RowValues::Null),
            fail_at: None,
        }
    }
}

impl Script {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The procedure produces this row-set.
    #[must_use]
    pub fn with_rows(mut self, rows: ResultSet) -> Self {
        self.rows = Some(rows);
        self
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<RowValues>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Status pair written to the trailing slots; the code is reported as an integer.
    #[must_use]
    pub fn with_status(mut self, code: i16, message: &str) -> Self {
        self.status = (
            RowValues::Int(i64::from(code)),
            RowValues::Text(message.to_string()),
        );
        self
    }

    /// Status pair exactly as the driver would hand it back.
    #[must_use]
    pub fn with_raw_status(mut self, code: RowValues, message: RowValues) -> Self {
        self.status = (code, message);
        self
    }

    #[must_use]
    pub fn failing_at(mut self, fail_at: FailAt) -> Self {
        self.fail_at = Some(fail_at);
        self
    }

    fn check(&self, at: FailAt) -> Result<(), SprocError> {
        if self.fail_at == Some(at) {
            Err(SprocError::ExecutionError(format!("scripted failure at {at:?}")))
        } else {
            Ok(())
        }
    }
}

/// A binding the caller made, as the statement saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedBinding {
    Input {
        index: usize,
        value: RowValues,
        sql_type: SqlType,
    },
    Output {
        index: usize,
        sql_type: SqlType,
    },
}

impl RecordedBinding {
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            RecordedBinding::Input { index, .. } | RecordedBinding::Output { index, .. } => *index,
        }
    }
}

/// Counters and logs shared by every connection a [`ScriptedSource`] hands out.
#[derive(Debug, Default)]
pub struct CallStats {
    acquired: AtomicUsize,
    connections_released: AtomicUsize,
    statements_released: AtomicUsize,
    cursors_opened: AtomicUsize,
    cursors_released: AtomicUsize,
    executions: AtomicUsize,
    rows_read: AtomicUsize,
    statements: Mutex<Vec<String>>,
    bindings: Mutex<Vec<RecordedBinding>>,
}

impl CallStats {
    #[must_use]
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn connections_released(&self) -> usize {
        self.connections_released.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn statements_released(&self) -> usize {
        self.statements_released.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cursors_opened(&self) -> usize {
        self.cursors_opened.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cursors_released(&self) -> usize {
        self.cursors_released.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn rows_read(&self) -> usize {
        self.rows_read.load(Ordering::SeqCst)
    }

    /// Statement texts passed to `prepare_call`, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Every binding made, in the order it was made.
    #[must_use]
    pub fn bindings(&self) -> Vec<RecordedBinding> {
        self.bindings
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    fn record_statement(&self, sql: &str) {
        if let Ok(mut statements) = self.statements.lock() {
            statements.push(sql.to_string());
        }
    }

    fn record_binding(&self, binding: RecordedBinding) {
        if let Ok(mut bindings) = self.bindings.lock() {
            bindings.push(binding);
        }
    }
}

/// Connection source backed by a [`Script`]. Each acquisition replays the same script.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    script: Script,
    stats: Arc<CallStats>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(script: Script) -> Self {
        Self {
            script,
            stats: Arc::new(CallStats::default()),
        }
    }

    /// Handle to the counters; stays valid after the source moves into a `Caller`.
    #[must_use]
    pub fn stats(&self) -> Arc<CallStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl ConnectionSource for ScriptedSource {
    async fn acquire(&self) -> Result<Box<dyn CallConnection>, SprocError> {
        self.script.check(FailAt::Acquire)?;
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            script: self.script.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct ScriptedConnection {
    script: Script,
    stats: Arc<CallStats>,
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.stats.connections_released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CallConnection for ScriptedConnection {
    async fn prepare_call<'a>(
        &'a mut self,
        sql: &str,
    ) -> Result<Box<dyn PreparedCall + 'a>, SprocError> {
        self.script.check(FailAt::Prepare)?;
        self.stats.record_statement(sql);
        Ok(Box::new(ScriptedCall {
            script: &self.script,
            stats: &self.stats,
            registered: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }))
    }
}

struct ScriptedCall<'a> {
    script: &'a Script,
    stats: &'a CallStats,
    registered: BTreeMap<usize, SqlType>,
    outputs: BTreeMap<usize, RowValues>,
}

impl Drop for ScriptedCall<'_> {
    fn drop(&mut self) {
        self.stats.statements_released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PreparedCall for ScriptedCall<'_> {
    fn set_input(
        &mut self,
        index: usize,
        value: &RowValues,
        sql_type: SqlType,
    ) -> Result<(), SprocError> {
        self.script.check(FailAt::Bind)?;
        self.stats.record_binding(RecordedBinding::Input {
            index,
            value: value.clone(),
            sql_type,
        });
        Ok(())
    }

    fn register_output(&mut self, index: usize, sql_type: SqlType) -> Result<(), SprocError> {
        self.script.check(FailAt::Bind)?;
        self.stats
            .record_binding(RecordedBinding::Output { index, sql_type });
        self.registered.insert(index, sql_type);
        Ok(())
    }

    async fn execute(&mut self) -> Result<bool, SprocError> {
        self.stats.executions.fetch_add(1, Ordering::SeqCst);
        self.script.check(FailAt::Execute)?;

        let positions: Vec<usize> = self.registered.keys().copied().collect();
        let declared = self.script.outputs.len().min(positions.len());
        for (pos, value) in positions.iter().zip(&self.script.outputs) {
            self.outputs.insert(*pos, value.clone());
        }
        let rest = &positions[declared..];
        if let [code, message] = rest {
            self.outputs.insert(*code, self.script.status.0.clone());
            self.outputs.insert(*message, self.script.status.1.clone());
        } else {
            for pos in rest {
                self.outputs.insert(*pos, RowValues::Null);
            }
        }

        Ok(self.script.rows.is_some())
    }

    async fn result_set<'b>(&'b mut self) -> Result<Box<dyn RowCursor + 'b>, SprocError> {
        self.script.check(FailAt::ResultSet)?;
        let rows = self.script.rows.clone().unwrap_or_default();
        self.stats.cursors_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedCursor {
            rows: rows.results.into_iter(),
            next: 0,
            fail_at: self.script.fail_at,
            stats: self.stats,
        }))
    }

    fn output(&self, index: usize) -> Result<RowValues, SprocError> {
        captured_output(&self.outputs, index)
    }
}

struct ScriptedCursor<'a> {
    rows: std::vec::IntoIter<CustomDbRow>,
    next: usize,
    fail_at: Option<FailAt>,
    stats: &'a CallStats,
}

impl Drop for ScriptedCursor<'_> {
    fn drop(&mut self) {
        self.stats.cursors_released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RowCursor for ScriptedCursor<'_> {
    async fn next_row(&mut self) -> Result<Option<CustomDbRow>, SprocError> {
        if self.fail_at == Some(FailAt::Row(self.next)) {
            return Err(SprocError::ExecutionError(format!(
                "scripted failure reading row {}",
                self.next
            )));
        }
        let row = self.rows.next();
        if row.is_some() {
            self.next += 1;
            self.stats.rows_read.fetch_add(1, Ordering::SeqCst);
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_goes_to_the_two_trailing_slots() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let source = ScriptedSource::new(
                Script::new()
                    .with_outputs(vec![RowValues::Int(9)])
                    .with_status(3, "nope"),
            );
            let mut conn = source.acquire().await.unwrap();
            let mut stmt = conn.prepare_call("{call p(?,?,?)}").await.unwrap();
            for idx in 1..=3 {
                stmt.register_output(idx, SqlType::Integer).unwrap();
            }
            assert!(!stmt.execute().await.unwrap());
            assert_eq!(stmt.output(1).unwrap(), RowValues::Int(9));
            assert_eq!(stmt.output(2).unwrap(), RowValues::Int(3));
            assert_eq!(stmt.output(3).unwrap(), RowValues::Text("nope".into()));
        });
    }
}
