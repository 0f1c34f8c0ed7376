use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::ops::DerefMut;

use async_trait::async_trait;
use tiberius::Query;

use super::config::MssqlClient;
use super::params::{bind_input, declared_type};
use super::query::collect_result_sets;
use crate::driver::{BufferedRows, CallConnection, PreparedCall, RowCursor, captured_output};
use crate::error::SprocError;
use crate::results::ResultSet;
use crate::translation::{CallArgument, parse_call_escape};
use crate::types::{RowValues, SqlType};

/// A SQL Server connection: either a pooled object or an owned client.
///
/// Dropping it returns the connection to its pool or closes it.
pub struct MssqlConnection<C> {
    client: C,
}

impl<C> MssqlConnection<C>
where
    C: DerefMut<Target = MssqlClient> + Send + 'static,
{
    pub(crate) fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> CallConnection for MssqlConnection<C>
where
    C: DerefMut<Target = MssqlClient> + Send + 'static,
{
    async fn prepare_call<'a>(
        &'a mut self,
        sql: &str,
    ) -> Result<Box<dyn PreparedCall + 'a>, SprocError> {
        Ok(Box::new(MssqlPreparedCall {
            client: &mut *self.client,
            sql: sql.to_string(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            output_values: BTreeMap::new(),
            row_set: None,
        }))
    }
}

/// A procedure call run as one T-SQL batch.
///
/// Registered outputs are declared as local variables, passed with `OUTPUT`, and selected
/// after the `EXEC`; that trailing result set is read back as the output values. The first
/// result set before it, if any, is the procedure's row-set.
pub struct MssqlPreparedCall<'a> {
    client: &'a mut MssqlClient,
    sql: String,
    inputs: BTreeMap<usize, (RowValues, SqlType)>,
    outputs: BTreeMap<usize, SqlType>,
    output_values: BTreeMap<usize, RowValues>,
    row_set: Option<ResultSet>,
}

fn output_var(index: usize) -> String {
    format!("@sp_out{index}")
}

/// Renders a `{call …}` escape as a batch. Inputs become `@P1..@Pn` in the order they
/// appear; the returned list gives the position each `@Pn` was bound from.
fn render_batch(
    sql: &str,
    inputs: &BTreeMap<usize, (RowValues, SqlType)>,
    outputs: &BTreeMap<usize, SqlType>,
) -> Result<(String, Vec<usize>), SprocError> {
    let escape = parse_call_escape(sql)?;
    let mut args = Vec::with_capacity(escape.arguments.len());
    let mut bound = Vec::with_capacity(inputs.len());

    for arg in &escape.arguments {
        match *arg {
            CallArgument::Literal(text) => args.push(text.to_string()),
            CallArgument::Placeholder(idx) => {
                if outputs.contains_key(&idx) {
                    args.push(format!("{} OUTPUT", output_var(idx)));
                } else if inputs.contains_key(&idx) {
                    bound.push(idx);
                    args.push(format!("@P{}", bound.len()));
                } else {
                    return Err(SprocError::ParameterError(format!(
                        "parameter {idx} was neither bound nor registered"
                    )));
                }
            }
        }
    }

    let mut batch = String::from("SET NOCOUNT ON;\n");
    for (idx, ty) in outputs {
        let _ = writeln!(batch, "DECLARE {} {};", output_var(*idx), declared_type(*ty));
    }
    let _ = write!(batch, "EXEC {}", escape.procedure);
    if !args.is_empty() {
        let _ = write!(batch, " {}", args.join(", "));
    }
    batch.push_str(";\n");
    if !outputs.is_empty() {
        let selected: Vec<String> = outputs.keys().map(|idx| output_var(*idx)).collect();
        let _ = writeln!(batch, "SELECT {};", selected.join(", "));
    }

    Ok((batch, bound))
}

#[async_trait]
impl PreparedCall for MssqlPreparedCall<'_> {
    fn set_input(
        &mut self,
        index: usize,
        value: &RowValues,
        sql_type: SqlType,
    ) -> Result<(), SprocError> {
        self.inputs.insert(index, (value.clone(), sql_type));
        Ok(())
    }

    fn register_output(&mut self, index: usize, sql_type: SqlType) -> Result<(), SprocError> {
        self.outputs.insert(index, sql_type);
        Ok(())
    }

    async fn execute(&mut self) -> Result<bool, SprocError> {
        let (batch, bound) = render_batch(&self.sql, &self.inputs, &self.outputs)?;
        let mut query = Query::new(batch);
        for idx in bound {
            if let Some((value, ty)) = self.inputs.get(&idx) {
                bind_input(&mut query, value, *ty)?;
            }
        }

        let stream = query.query(&mut *self.client).await?;
        let mut sets = collect_result_sets(stream).await?;

        if !self.outputs.is_empty() {
            let out = sets.pop().ok_or_else(|| {
                SprocError::ExecutionError("procedure returned no output parameter row".into())
            })?;
            let row = out.results.first().ok_or_else(|| {
                SprocError::ExecutionError("procedure returned no output parameter row".into())
            })?;
            for (col, index) in self.outputs.keys().enumerate() {
                let value = row.get_by_index(col).cloned().ok_or_else(|| {
                    SprocError::ExecutionError(format!("missing output value for parameter {index}"))
                })?;
                self.output_values.insert(*index, value);
            }
        }

        if sets.len() > 1 {
            tracing::debug!(
                extra = sets.len() - 1,
                "ignoring result sets after the first"
            );
        }
        self.row_set = sets.into_iter().next();
        Ok(self.row_set.is_some())
    }

    async fn result_set<'a>(&'a mut self) -> Result<Box<dyn RowCursor + 'a>, SprocError> {
        let rows = self.row_set.take().ok_or_else(|| {
            SprocError::ExecutionError("procedure produced no row-set".to_string())
        })?;
        Ok(Box::new(BufferedRows::new(rows)))
    }

    fn output(&self, index: usize) -> Result<RowValues, SprocError> {
        captured_output(&self.output_values, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_declares_and_selects_outputs() {
        let mut inputs = BTreeMap::new();
        inputs.insert(1, (RowValues::Int(42), SqlType::Integer));
        inputs.insert(2, (RowValues::Text("x".into()), SqlType::Varchar));
        let mut outputs = BTreeMap::new();
        outputs.insert(3, SqlType::Integer);
        outputs.insert(4, SqlType::Boolean);
        outputs.insert(5, SqlType::Varchar);

        let (batch, bound) =
            render_batch("{call dbo.save_item(?,?,?,?,?)}", &inputs, &outputs).unwrap();
        assert_eq!(bound, vec![1, 2]);
        assert_eq!(
            batch,
            "SET NOCOUNT ON;\n\
             DECLARE @sp_out3 int;\n\
             DECLARE @sp_out4 bit;\n\
             DECLARE @sp_out5 nvarchar(4000);\n\
             EXEC dbo.save_item @P1, @P2, @sp_out3 OUTPUT, @sp_out4 OUTPUT, @sp_out5 OUTPUT;\n\
             SELECT @sp_out3, @sp_out4, @sp_out5;\n"
        );
    }

    #[test]
    fn no_arguments_no_select() {
        let (batch, bound) =
            render_batch("{call list_all()}", &BTreeMap::new(), &BTreeMap::new()).unwrap();
        assert!(bound.is_empty());
        assert_eq!(batch, "SET NOCOUNT ON;\nEXEC list_all;\n");
    }
}
